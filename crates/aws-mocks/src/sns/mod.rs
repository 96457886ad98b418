//! # SNS Backend
//!
//! Topics and an append-only log of published messages. SES publishes bounce, complaint and
//! delivery notifications here; tests read them back from [`SnsBackend::published`].

pub mod error;

pub use error::*;

use backend_core::tags::{remove_keys, to_list, to_map};
use backend_core::{
    paginate, time, Backend, BackendEntity, Page, PageLimits, PageRequest, ResourceStore, Scope,
    Tag, TagMap, TagPolicy,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, instrument};
use uuid::Uuid;

const TOPIC_PAGE: PageLimits = PageLimits::new(100, 100);

#[derive(Debug, Clone, Serialize)]
pub struct Topic {
    pub arn: String,
    pub name: String,
    pub display_name: Option<String>,
    pub tags: TagMap,
}

#[derive(Debug, Clone, Default)]
pub struct TopicCreate {
    pub display_name: Option<String>,
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublishedMessage {
    pub message_id: String,
    pub topic_arn: String,
    pub subject: Option<String>,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl BackendEntity for Topic {
    type Id = String;
    type Create = (String, TopicCreate);
    type Update = Option<String>;
    type Context = Scope;
    type Error = SnsError;
    const KIND: &'static str = "Topic";

    fn id(&self) -> &String {
        &self.arn
    }

    fn from_create_params(
        arn: String,
        (name, params): (String, TopicCreate),
        _scope: &Scope,
    ) -> Result<Self, SnsError> {
        let tags = to_map(&params.tags);
        TagPolicy::STANDARD.check_replacement(&tags)?;
        Ok(Self {
            arn,
            name,
            display_name: params.display_name,
            tags,
        })
    }

    fn on_update(&mut self, display_name: Option<String>, _scope: &Scope) -> Result<(), SnsError> {
        self.display_name = display_name;
        Ok(())
    }

    fn not_found(_arn: &String, _scope: &Scope) -> SnsError {
        SnsError::NotFound
    }

    fn already_exists(arn: &String, _scope: &Scope) -> SnsError {
        SnsError::InvalidParameter(format!("Topic already exists: {arn}"))
    }
}

fn valid_topic_name(name: &str) -> bool {
    let base = name.strip_suffix(".fifo").unwrap_or(name);
    !base.is_empty()
        && name.len() <= 256
        && base
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[derive(Debug)]
pub struct SnsBackend {
    scope: Scope,
    topics: ResourceStore<Topic>,
    published: Vec<PublishedMessage>,
}

impl Backend for SnsBackend {
    const SERVICE: &'static str = "sns";

    fn new(scope: Scope) -> Self {
        Self {
            topics: ResourceStore::new(scope.clone()),
            published: Vec::new(),
            scope,
        }
    }
}

impl SnsBackend {
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn topic_arn(&self, name: &str) -> String {
        self.scope.arn("sns", name)
    }

    /// Idempotent by name: creating an existing topic returns it, unless tags differ.
    #[instrument(skip(self, params), fields(region = %self.scope.region))]
    pub fn create_topic(&mut self, name: &str, params: TopicCreate) -> Result<Topic, SnsError> {
        if !valid_topic_name(name) {
            return Err(SnsError::InvalidParameter(
                "Topic Name must match [a-zA-Z0-9_-]{1,256}".to_string(),
            ));
        }
        let arn = self.topic_arn(name);
        if let Some(existing) = self.topics.get(&arn) {
            if !params.tags.is_empty() && existing.tags != to_map(&params.tags) {
                return Err(SnsError::InvalidParameter(
                    "Tags Reason: Topic already exists with different tags".to_string(),
                ));
            }
            return Ok(existing.clone());
        }
        self.topics
            .create(arn, (name.to_string(), params))
            .map(|topic| topic.clone())
    }

    pub fn get_topic(&self, arn: &str) -> Result<&Topic, SnsError> {
        self.topics.require(&arn.to_string())
    }

    pub fn set_display_name(&mut self, arn: &str, display_name: Option<String>) -> Result<(), SnsError> {
        self.topics.update(&arn.to_string(), display_name).map(|_| ())
    }

    pub fn delete_topic(&mut self, arn: &str) {
        self.topics.discard(&arn.to_string());
    }

    pub fn list_topics(&self, request: &PageRequest) -> Result<Page<String>, SnsError> {
        let arns: Vec<String> = self.topics.ids().cloned().collect();
        paginate(arns, request, TOPIC_PAGE, &(), |arn| arn.clone())
            .map_err(|e| SnsError::InvalidParameter(e.to_string()))
    }

    pub fn topics(&self) -> impl Iterator<Item = &Topic> {
        self.topics.values()
    }

    #[instrument(skip(self, message), fields(region = %self.scope.region))]
    pub fn publish(
        &mut self,
        topic_arn: &str,
        subject: Option<&str>,
        message: &str,
    ) -> Result<String, SnsError> {
        self.topics.require(&topic_arn.to_string())?;
        let message_id = Uuid::new_v4().to_string();
        debug!(topic_arn, %message_id, "Publish");
        self.published.push(PublishedMessage {
            message_id: message_id.clone(),
            topic_arn: topic_arn.to_string(),
            subject: subject.map(str::to_string),
            message: message.to_string(),
            timestamp: time::now(),
        });
        info!(topic_arn, count = self.published.len(), "Published");
        Ok(message_id)
    }

    /// Every message published so far, oldest first.
    pub fn published(&self) -> &[PublishedMessage] {
        &self.published
    }

    pub fn published_to<'a>(&'a self, topic_arn: &'a str) -> impl Iterator<Item = &'a PublishedMessage> {
        self.published.iter().filter(move |m| m.topic_arn == topic_arn)
    }

    pub fn tag_resource(&mut self, arn: &str, tags: &[Tag]) -> Result<(), SnsError> {
        let topic = self
            .topics
            .get_mut(&arn.to_string())
            .ok_or(SnsError::ResourceNotFound)?;
        TagPolicy::STANDARD.apply(&mut topic.tags, &to_map(tags))?;
        Ok(())
    }

    pub fn untag_resource(&mut self, arn: &str, keys: &[String]) -> Result<(), SnsError> {
        let topic = self
            .topics
            .get_mut(&arn.to_string())
            .ok_or(SnsError::ResourceNotFound)?;
        remove_keys(&mut topic.tags, keys);
        Ok(())
    }

    pub fn list_tags_for_resource(&self, arn: &str) -> Result<Vec<Tag>, SnsError> {
        let topic = self
            .topics
            .get(&arn.to_string())
            .ok_or(SnsError::ResourceNotFound)?;
        Ok(to_list(&topic.tags))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> SnsBackend {
        SnsBackend::new(Scope::new("123456789012", "us-east-1"))
    }

    #[test]
    fn create_is_idempotent_by_name() {
        let mut sns = backend();
        let first = sns.create_topic("alerts", TopicCreate::default()).unwrap();
        let second = sns.create_topic("alerts", TopicCreate::default()).unwrap();
        assert_eq!(first.arn, second.arn);
        assert_eq!(first.arn, "arn:aws:sns:us-east-1:123456789012:alerts");
        assert_eq!(sns.topics().count(), 1);
    }

    #[test]
    fn recreate_with_other_tags_fails() {
        let mut sns = backend();
        let tagged = TopicCreate {
            tags: vec![Tag::new("team", "a")],
            ..TopicCreate::default()
        };
        sns.create_topic("alerts", tagged).unwrap();
        let retagged = TopicCreate {
            tags: vec![Tag::new("team", "b")],
            ..TopicCreate::default()
        };
        assert!(matches!(
            sns.create_topic("alerts", retagged),
            Err(SnsError::InvalidParameter(_))
        ));
    }

    #[test]
    fn publish_requires_topic() {
        let mut sns = backend();
        assert_eq!(
            sns.publish("arn:aws:sns:us-east-1:123456789012:nope", None, "hi"),
            Err(SnsError::NotFound)
        );
        let topic = sns.create_topic("t", TopicCreate::default()).unwrap();
        sns.publish(&topic.arn, Some("s"), "hi").unwrap();
        assert_eq!(sns.published_to(&topic.arn).count(), 1);
        sns.delete_topic(&topic.arn);
        sns.delete_topic(&topic.arn);
        assert_eq!(sns.published().len(), 1);
    }

    #[test]
    fn tag_limit() {
        let mut sns = backend();
        let topic = sns.create_topic("t", TopicCreate::default()).unwrap();
        let tags: Vec<Tag> = (0..51).map(|i| Tag::new(format!("k{i}"), "v")).collect();
        assert_eq!(
            sns.tag_resource(&topic.arn, &tags),
            Err(SnsError::TagLimitExceeded)
        );
        assert!(sns.list_tags_for_resource(&topic.arn).unwrap().is_empty());
        assert_eq!(
            sns.untag_resource("arn:aws:sns:us-east-1:123456789012:x", &[]),
            Err(SnsError::ResourceNotFound)
        );
    }
}
