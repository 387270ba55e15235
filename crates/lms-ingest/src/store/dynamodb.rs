//! DynamoDB-backed assignment store

use async_trait::async_trait;
use aws_config::retry::RetryConfig;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_dynamodb::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client;
use std::collections::HashMap;
use tracing::{debug, info};

use super::{AssignmentStore, StoreError};
use crate::config::StoreConfig;
use crate::model::AssignmentItem;

/// Writes assignments to a DynamoDB table with `PutItem`.
///
/// The client is owned by the store, so the session lives exactly as long as
/// the value and is released on every exit path.
#[derive(Clone, Debug)]
pub struct DynamoStore {
    client: Client,
    table_name: String,
}

impl DynamoStore {
    pub async fn connect(config: &StoreConfig) -> Self {
        debug!(config = ?config, "Initializing DynamoDB client");

        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .retry_config(RetryConfig::standard().with_max_attempts(config.max_attempts));

        if let Some(credentials) = &config.credentials {
            loader = loader.credentials_provider(aws_credential_types::Credentials::new(
                &credentials.access_key_id,
                &credentials.secret_access_key,
                credentials.session_token.clone(),
                None,
                "lms-load",
            ));
        }

        if let Some(endpoint) = &config.endpoint {
            loader = loader.endpoint_url(endpoint);
        }

        let sdk_config = loader.load().await;

        info!(
            table = %config.table_name,
            region = %config.region,
            "DynamoDB client initialized"
        );

        Self {
            client: Client::new(&sdk_config),
            table_name: config.table_name.clone(),
        }
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }
}

#[async_trait]
impl AssignmentStore for DynamoStore {
    async fn upsert(&self, item: &AssignmentItem) -> Result<(), StoreError> {
        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(item_attributes(item)))
            .send()
            .await
            .map_err(store_error)?;

        Ok(())
    }
}

/// Attribute map for an item: numbers as `N`, the flag as `BOOL`, text as `S`
pub fn item_attributes(item: &AssignmentItem) -> HashMap<String, AttributeValue> {
    let number = |n: i64| AttributeValue::N(n.to_string());
    let text = |s: &str| AttributeValue::S(s.to_string());

    HashMap::from([
        ("lms_user_id".to_string(), number(item.lms_user_id)),
        ("activity_id".to_string(), number(item.activity_id)),
        ("calnet_uid".to_string(), text(&item.calnet_uid)),
        ("empl_id".to_string(), text(&item.empl_id)),
        ("full_name".to_string(), text(&item.full_name)),
        ("given_name".to_string(), text(&item.given_name)),
        ("family_name".to_string(), text(&item.family_name)),
        ("empl_org_code".to_string(), text(&item.empl_org_code)),
        ("manager_empl_id".to_string(), text(&item.manager_empl_id)),
        ("activity_code".to_string(), text(&item.activity_code)),
        ("activity_name".to_string(), text(&item.activity_name)),
        ("is_required".to_string(), AttributeValue::Bool(item.is_required)),
        ("assignment_status".to_string(), text(&item.assignment_status)),
        ("assigned_date".to_string(), text(&item.assigned_date)),
        ("due_date".to_string(), text(&item.due_date)),
        ("expiration_date".to_string(), text(&item.expiration_date)),
        ("last_attempt_date".to_string(), text(&item.last_attempt_date)),
        ("last_completion_date".to_string(), text(&item.last_completion_date)),
        ("last_updated_datetime".to_string(), text(&item.last_updated_datetime)),
        ("last_updated_event_id".to_string(), number(item.last_updated_event_id)),
    ])
}

/// Reduce an SDK error to code and message.
///
/// Service errors keep the code DynamoDB reported. Failures that never got a
/// service response are named after the SDK failure kind, which the
/// classifier does not know and therefore reports as unrecognized.
fn store_error<E, R>(err: SdkError<E, R>) -> StoreError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug,
{
    let code = match err.code() {
        Some(code) => code.to_string(),
        None => failure_kind(&err).to_string(),
    };
    let message = err
        .message()
        .map(str::to_string)
        .unwrap_or_else(|| DisplayErrorContext(&err).to_string());

    StoreError { code, message }
}

fn failure_kind<E, R>(err: &SdkError<E, R>) -> &'static str {
    match err {
        SdkError::ConstructionFailure(_) => "ConstructionFailure",
        SdkError::TimeoutError(_) => "TimeoutError",
        SdkError::DispatchFailure(_) => "DispatchFailure",
        SdkError::ResponseError(_) => "ResponseError",
        SdkError::ServiceError(_) => "ServiceError",
        _ => "SdkError",
    }
}
