//! [`TaggedResourceSource`] for every backend the tagging API reaches.

use super::TaggedResourceSource;
use crate::codepipeline::CodePipelineBackend;
use crate::ec2::{Ec2Backend, TagRemoval};
use crate::s3::{bucket_name_from_arn, S3Backend, S3Error};
use crate::sns::SnsBackend;
use backend_core::ids::ParsedArn;
use backend_core::{ErrorDetails, ProviderError, Tag, TagMap};

impl TaggedResourceSource for CodePipelineBackend {
    fn service(&self) -> &'static str {
        "codepipeline"
    }

    fn tagged_resources(&self) -> Vec<(String, TagMap)> {
        self.pipelines()
            .filter(|p| !p.tags.is_empty())
            .map(|p| (p.arn.clone(), p.tags.clone()))
            .collect()
    }

    fn tag(&mut self, arn: &str, tags: &[Tag]) -> Result<(), ErrorDetails> {
        self.tag_resource(arn, tags).map_err(|e| e.details())
    }

    fn untag(&mut self, arn: &str, keys: &[String]) -> Result<(), ErrorDetails> {
        self.untag_resource(arn, keys).map_err(|e| e.details())
    }
}

fn ec2_resource_id(arn: &str) -> String {
    ParsedArn::parse(arn)
        .map(|parsed| parsed.resource_name())
        .unwrap_or(arn)
        .to_string()
}

impl TaggedResourceSource for Ec2Backend {
    fn service(&self) -> &'static str {
        "ec2"
    }

    fn tagged_resources(&self) -> Vec<(String, TagMap)> {
        Ec2Backend::tagged_resources(self)
    }

    fn tag(&mut self, arn: &str, tags: &[Tag]) -> Result<(), ErrorDetails> {
        self.create_tags(&[ec2_resource_id(arn)], tags)
            .map_err(|e| e.details())
    }

    fn untag(&mut self, arn: &str, keys: &[String]) -> Result<(), ErrorDetails> {
        let removals: Vec<TagRemoval> = keys.iter().map(TagRemoval::key).collect();
        self.delete_tags(&[ec2_resource_id(arn)], &removals)
            .map_err(|e| e.details())
    }
}

impl TaggedResourceSource for SnsBackend {
    fn service(&self) -> &'static str {
        "sns"
    }

    fn tagged_resources(&self) -> Vec<(String, TagMap)> {
        self.topics()
            .filter(|t| !t.tags.is_empty())
            .map(|t| (t.arn.clone(), t.tags.clone()))
            .collect()
    }

    fn tag(&mut self, arn: &str, tags: &[Tag]) -> Result<(), ErrorDetails> {
        self.tag_resource(arn, tags).map_err(|e| e.details())
    }

    fn untag(&mut self, arn: &str, keys: &[String]) -> Result<(), ErrorDetails> {
        self.untag_resource(arn, keys).map_err(|e| e.details())
    }
}

fn bucket_name(arn: &str) -> Result<&str, ErrorDetails> {
    bucket_name_from_arn(arn).ok_or_else(|| S3Error::NoSuchBucket(arn.to_string()).details())
}

impl TaggedResourceSource for S3Backend {
    fn service(&self) -> &'static str {
        "s3"
    }

    fn tagged_resources(&self) -> Vec<(String, TagMap)> {
        S3Backend::tagged_resources(self)
    }

    fn tag(&mut self, arn: &str, tags: &[Tag]) -> Result<(), ErrorDetails> {
        self.tag_bucket(bucket_name(arn)?, tags)
            .map_err(|e| e.details())
    }

    fn untag(&mut self, arn: &str, keys: &[String]) -> Result<(), ErrorDetails> {
        self.untag_bucket(bucket_name(arn)?, keys)
            .map_err(|e| e.details())
    }
}
