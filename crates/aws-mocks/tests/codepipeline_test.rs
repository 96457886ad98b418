use aws_mocks::codepipeline::{
    ActionDeclaration, CodePipelineBackend, CodePipelineError, PipelineDeclaration,
    StageDeclaration,
};
use aws_mocks::iam::{IamBackend, RoleCreate};
use aws_mocks::AwsContext;
use backend_core::{ErrorKind, PageRequest, ProviderError, Tag};

const ACCOUNT: &str = "123456789012";
const REGION: &str = "us-east-1";

const TRUST_POLICY: &str = r#"{"Statement":[{"Effect":"Allow","Principal":{"Service":"codepipeline.amazonaws.com"},"Action":"sts:AssumeRole"}]}"#;
const EC2_ONLY_POLICY: &str = r#"{"Statement":[{"Effect":"Allow","Principal":{"Service":"ec2.amazonaws.com"},"Action":"sts:AssumeRole"}]}"#;

fn stage(name: &str) -> StageDeclaration {
    StageDeclaration::new(name, vec![ActionDeclaration::new(name, "Source", "S3")])
}

fn declaration(name: &str, role_arn: &str, stages: usize) -> PipelineDeclaration {
    PipelineDeclaration {
        name: name.to_string(),
        role_arn: role_arn.to_string(),
        artifact_store: None,
        stages: (0..stages).map(|i| stage(&format!("Stage{i}"))).collect(),
        version: None,
    }
}

/// Context with one role the pipeline service may assume; returns its ARN.
fn context_with_role() -> (AwsContext, String) {
    let mut aws = AwsContext::default();
    let role = aws
        .iam(ACCOUNT, REGION)
        .create_role("pipeline-role", RoleCreate::new(TRUST_POLICY))
        .expect("Failed to create role");
    (aws, role.arn)
}

fn create(
    pipelines: &mut CodePipelineBackend,
    iam: &IamBackend,
    declaration: PipelineDeclaration,
) -> Result<PipelineDeclaration, CodePipelineError> {
    pipelines
        .create_pipeline(iam, declaration, Vec::new())
        .map(|(created, _)| created)
}

#[test]
fn test_create_fills_defaults_and_starts_at_version_one() {
    let (mut aws, role_arn) = context_with_role();
    let (pipelines, iam) = aws.codepipeline_with_iam(ACCOUNT, REGION);

    let created = create(pipelines, iam, declaration("p", &role_arn, 2)).expect("Failed to create pipeline");

    assert_eq!(created.version, Some(1));
    let action = &created.stages[0].actions[0];
    assert_eq!(action.run_order, Some(1));
    assert_eq!(action.configuration, Some(Default::default()));
    assert_eq!(action.input_artifacts, Some(Vec::new()));
    assert_eq!(action.output_artifacts, Some(Vec::new()));

    let (stored, metadata) = pipelines.get_pipeline("p").expect("Failed to get pipeline");
    assert_eq!(stored, created);
    assert_eq!(metadata.pipeline_arn, "arn:aws:codepipeline:us-east-1:123456789012:p");
    assert_eq!(metadata.created, metadata.updated);
}

#[test]
fn test_single_stage_is_invalid_structure() {
    let (mut aws, role_arn) = context_with_role();
    let (pipelines, iam) = aws.codepipeline_with_iam(ACCOUNT, REGION);

    let err = create(pipelines, iam, declaration("p", &role_arn, 1)).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::StructureInvalid);
    assert_eq!(err.code(), "InvalidStructureException");
    assert!(err.to_string().contains("minimum of 2 stages"), "{err}");
    assert!(pipelines.pipelines().next().is_none());
}

#[test]
fn test_role_must_exist_and_trust_the_service() {
    let (mut aws, _) = context_with_role();
    let untrusted = aws
        .iam(ACCOUNT, REGION)
        .create_role("ec2-role", RoleCreate::new(EC2_ONLY_POLICY))
        .expect("Failed to create role");
    let (pipelines, iam) = aws.codepipeline_with_iam(ACCOUNT, REGION);

    for role_arn in [untrusted.arn.as_str(), "arn:aws:iam::123456789012:role/missing"] {
        let err = create(pipelines, iam, declaration("p", role_arn, 2)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StructureInvalid);
        assert!(err.to_string().contains("not authorized to perform AssumeRole"), "{err}");
    }
}

#[test]
fn test_duplicate_name_keeps_first_pipeline() {
    let (mut aws, role_arn) = context_with_role();
    let (pipelines, iam) = aws.codepipeline_with_iam(ACCOUNT, REGION);
    create(pipelines, iam, declaration("p", &role_arn, 2)).expect("Failed to create pipeline");

    let err = create(pipelines, iam, declaration("p", &role_arn, 3)).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::AlreadyExists);
    assert_eq!(err.code(), "InvalidStructureException");
    let (stored, _) = pipelines.get_pipeline("p").expect("Failed to get pipeline");
    assert_eq!(stored.stages.len(), 2);
}

#[test]
fn test_update_bumps_version_by_one() {
    let (mut aws, role_arn) = context_with_role();
    let (pipelines, iam) = aws.codepipeline_with_iam(ACCOUNT, REGION);
    create(pipelines, iam, declaration("p", &role_arn, 2)).expect("Failed to create pipeline");

    let mut changed = declaration("p", &role_arn, 3);
    changed.stages[2].actions[0].run_order = Some(4);
    let updated = pipelines.update_pipeline(changed).expect("Failed to update pipeline");
    assert_eq!(updated.version, Some(2));
    assert_eq!(updated.stages[2].actions[0].run_order, Some(4));

    let again = pipelines
        .update_pipeline(declaration("p", &role_arn, 2))
        .expect("Failed to update pipeline");
    assert_eq!(again.version, Some(3));
}

#[test]
fn test_missing_pipelines() {
    let (mut aws, role_arn) = context_with_role();
    let pipelines = aws.codepipeline(ACCOUNT, REGION);

    let get = pipelines.get_pipeline("ghost").unwrap_err();
    assert_eq!(get.kind(), ErrorKind::NotFound);
    assert_eq!(get.code(), "PipelineNotFoundException");
    assert_eq!(
        get.to_string(),
        "Account '123456789012' does not have a pipeline with name 'ghost'"
    );

    let update = pipelines.update_pipeline(declaration("ghost", &role_arn, 2)).unwrap_err();
    assert_eq!(update.code(), "ResourceNotFoundException");

    // Deleting an unknown pipeline is a no-op
    pipelines.delete_pipeline("ghost");
}

#[test]
fn test_list_pipelines_pages_by_name() {
    let (mut aws, role_arn) = context_with_role();
    let (pipelines, iam) = aws.codepipeline_with_iam(ACCOUNT, REGION);
    for name in ["c", "a", "b"] {
        create(pipelines, iam, declaration(name, &role_arn, 2)).expect("Failed to create pipeline");
    }

    let first = pipelines
        .list_pipelines(&PageRequest::first(2))
        .expect("Failed to list pipelines");
    let names: Vec<_> = first.items.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["a", "b"]);

    let next = PageRequest::first(2).next(&first).expect("Expected a next token");
    let second = pipelines.list_pipelines(&next).expect("Failed to list pipelines");
    assert_eq!(second.items.len(), 1);
    assert_eq!(second.items[0].name, "c");
    assert!(second.next_token.is_none());

    let bad = PageRequest::new(None, Some("garbage".to_string()));
    assert_eq!(
        pipelines.list_pipelines(&bad).unwrap_err().code(),
        "InvalidNextTokenException"
    );
}

#[test]
fn test_tag_limit_leaves_tags_unchanged() {
    let (mut aws, role_arn) = context_with_role();
    let (pipelines, iam) = aws.codepipeline_with_iam(ACCOUNT, REGION);
    let initial: Vec<Tag> = (0..45).map(|i| Tag::new(format!("k{i:02}"), "v")).collect();
    let (_, tags) = pipelines
        .create_pipeline(iam, declaration("p", &role_arn, 2), initial)
        .expect("Failed to create pipeline");
    assert_eq!(tags.len(), 45);
    let arn = pipelines.get_pipeline("p").expect("Failed to get pipeline").1.pipeline_arn;

    let extra: Vec<Tag> = (0..6).map(|i| Tag::new(format!("extra{i}"), "v")).collect();
    let err = pipelines.tag_resource(&arn, &extra).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::LimitExceeded);
    assert_eq!(err.code(), "TooManyTagsException");
    assert_eq!(pipelines.list_tags_for_resource(&arn).expect("Failed to list tags").len(), 45);

    // Overwriting existing keys does not count twice
    pipelines
        .tag_resource(&arn, &[Tag::new("k00", "changed"), Tag::new("new", "v")])
        .expect("Failed to tag pipeline");
    let tags = pipelines.list_tags_for_resource(&arn).expect("Failed to list tags");
    assert_eq!(tags.len(), 46);
    assert_eq!(tags[0], Tag::new("k00", "changed"));

    let reserved = pipelines.tag_resource(&arn, &[Tag::new("aws:k", "v")]).unwrap_err();
    assert_eq!(reserved.code(), "InvalidTagsException");

    pipelines
        .untag_resource(&arn, &["k00".to_string(), "absent".to_string()])
        .expect("Failed to untag pipeline");
    assert_eq!(pipelines.list_tags_for_resource(&arn).expect("Failed to list tags").len(), 45);
}

#[test]
fn test_repeated_tag_keys_are_rejected() {
    let (mut aws, role_arn) = context_with_role();
    let (pipelines, iam) = aws.codepipeline_with_iam(ACCOUNT, REGION);
    let repeated = vec![Tag::new("env", "dev"), Tag::new("env", "prod")];

    let err = pipelines
        .create_pipeline(iam, declaration("p", &role_arn, 2), repeated.clone())
        .unwrap_err();
    assert_eq!(err.code(), "InvalidTagsException");
    assert_eq!(err.kind(), ErrorKind::ValidationError);
    assert!(pipelines.get_pipeline("p").is_err());

    create(pipelines, iam, declaration("p", &role_arn, 2)).expect("Failed to create pipeline");
    let arn = pipelines.get_pipeline("p").expect("Failed to get pipeline").1.pipeline_arn;
    let err = pipelines.tag_resource(&arn, &repeated).unwrap_err();
    assert_eq!(err.code(), "InvalidTagsException");
    assert!(pipelines.list_tags_for_resource(&arn).expect("Failed to list tags").is_empty());
}
