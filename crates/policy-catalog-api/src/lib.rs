use std::sync::Arc;

use async_graphql::{
    Context, EmptyMutation, EmptySubscription, Enum, ErrorExtensions, InputObject,
    InputValueError, InputValueResult, Object, Scalar, ScalarType, Schema, SimpleObject, Value,
    ID,
};
use serde::{Deserialize, Serialize};

use policy_catalog_core::{
    resolve_policy_page, CatalogError, Customer, PageRequest, Policy, PolicyPage, PolicyStore,
    SortCache, SortSpec,
};

/// The full policy-list operation as clients send it, kept verbatim so the
/// command line and tests speak the exact same wire dialect.
pub const POLICY_LIST_QUERY: &str = "\
query GetPolicies($offset: Int, $limit: Int, $sort: SortBy) {
  policyList(offset: $offset, limit: $limit, sort: $sort) {
    policies {
      id
      policyNumber
      provider
      insuranceType
      status
      startDate
      endDate
      createdAt
      customer {
        id
        firstName
        lastName
        dateOfBirth
      }
    }
    total
    hasNextPage
  }
}";

/// Shared state every resolver reads: the immutable store plus the sort
/// cache that outlives individual requests.
#[derive(Clone)]
pub struct CatalogContext {
    pub store: Arc<PolicyStore>,
    pub cache: Arc<SortCache>,
}

pub type CatalogSchema = Schema<QueryRoot, EmptyMutation, EmptySubscription>;

#[must_use]
pub fn build_schema(store: Arc<PolicyStore>, cache: Arc<SortCache>) -> CatalogSchema {
    Schema::build(QueryRoot, EmptyMutation, EmptySubscription)
        .data(CatalogContext { store, cache })
        .finish()
}

/// Date scalar carried as an integer of Unix epoch milliseconds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Date(pub i64);

#[Scalar]
impl ScalarType for Date {
    fn parse(value: Value) -> InputValueResult<Self> {
        match value {
            Value::Number(number) => number.as_i64().map(Date).ok_or_else(|| {
                InputValueError::custom("Date must be an integer of epoch milliseconds")
            }),
            other => Err(InputValueError::expected_type(other)),
        }
    }

    fn to_value(&self) -> Value {
        Value::Number(self.0.into())
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Enum)]
pub enum InsuranceType {
    Liability,
    Household,
    Health,
}

impl From<policy_catalog_core::InsuranceType> for InsuranceType {
    fn from(value: policy_catalog_core::InsuranceType) -> Self {
        match value {
            policy_catalog_core::InsuranceType::Liability => Self::Liability,
            policy_catalog_core::InsuranceType::Household => Self::Household,
            policy_catalog_core::InsuranceType::Health => Self::Health,
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Enum)]
pub enum PolicyStatus {
    Active,
    Pending,
    Cancelled,
    DroppedOut,
}

impl From<policy_catalog_core::PolicyStatus> for PolicyStatus {
    fn from(value: policy_catalog_core::PolicyStatus) -> Self {
        match value {
            policy_catalog_core::PolicyStatus::Active => Self::Active,
            policy_catalog_core::PolicyStatus::Pending => Self::Pending,
            policy_catalog_core::PolicyStatus::Cancelled => Self::Cancelled,
            policy_catalog_core::PolicyStatus::DroppedOut => Self::DroppedOut,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, Enum)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl From<SortOrder> for policy_catalog_core::SortOrder {
    fn from(value: SortOrder) -> Self {
        match value {
            SortOrder::Asc => Self::Asc,
            SortOrder::Desc => Self::Desc,
        }
    }
}

/// Sort request: `fields` is the flat wire field list (`customer` followed
/// by its sub-field for nested paths), `order` reverses the whole
/// composite and defaults to ascending.
#[derive(Debug, Clone, InputObject)]
pub struct SortBy {
    pub fields: Vec<String>,
    #[graphql(default)]
    pub order: SortOrder,
}

pub struct CustomerNode(pub Customer);

#[Object(name = "Customer")]
impl CustomerNode {
    async fn id(&self) -> ID {
        ID::from(self.0.id.as_str())
    }

    async fn first_name(&self) -> &str {
        &self.0.first_name
    }

    async fn last_name(&self) -> &str {
        &self.0.last_name
    }

    async fn date_of_birth(&self) -> Date {
        Date(self.0.date_of_birth.as_unix_millis())
    }
}

pub struct PolicyNode(pub Policy);

#[Object(name = "Policy")]
impl PolicyNode {
    async fn id(&self) -> ID {
        ID::from(self.0.id.as_str())
    }

    async fn customer(&self, ctx: &Context<'_>) -> async_graphql::Result<CustomerNode> {
        let context = ctx.data::<CatalogContext>()?;
        match context.store.customer(&self.0.customer_id) {
            Some(customer) => Ok(CustomerNode(customer.clone())),
            None => Err(to_graphql_error(&CatalogError::UnknownCustomer {
                policy: self.0.id.clone(),
                customer: self.0.customer_id.clone(),
            })),
        }
    }

    async fn provider(&self) -> &str {
        &self.0.provider
    }

    async fn insurance_type(&self) -> InsuranceType {
        self.0.insurance_type.into()
    }

    async fn status(&self) -> PolicyStatus {
        self.0.status.into()
    }

    async fn policy_number(&self) -> &str {
        &self.0.policy_number
    }

    async fn start_date(&self) -> Date {
        Date(self.0.start_date.as_unix_millis())
    }

    async fn end_date(&self) -> Date {
        Date(self.0.end_date.as_unix_millis())
    }

    async fn created_at(&self) -> Date {
        Date(self.0.created_at.as_unix_millis())
    }
}

/// One page of the policy list. `total` counts the whole collection,
/// `hasNextPage` reports whether the window stopped short of its end.
#[derive(SimpleObject)]
pub struct PolicyList {
    pub policies: Vec<PolicyNode>,
    pub total: i32,
    pub has_next_page: bool,
}

impl PolicyList {
    fn from_page(page: PolicyPage) -> Self {
        Self {
            policies: page.policies.into_iter().map(PolicyNode).collect(),
            total: i32::try_from(page.total).unwrap_or(i32::MAX),
            has_next_page: page.has_next_page,
        }
    }
}

pub struct QueryRoot;

#[Object(name = "Query")]
impl QueryRoot {
    /// Page of policies under an optional composite sort.
    async fn policy_list(
        &self,
        ctx: &Context<'_>,
        offset: Option<i32>,
        limit: Option<i32>,
        sort: Option<SortBy>,
    ) -> async_graphql::Result<PolicyList> {
        let context = ctx.data::<CatalogContext>()?;
        let request =
            build_page_request(offset, limit, sort).map_err(|err| to_graphql_error(&err))?;
        let page = resolve_policy_page(&context.store, &context.cache, &request)
            .map_err(|err| to_graphql_error(&err))?;
        Ok(PolicyList::from_page(page))
    }

    /// Every customer in the catalog, in store order.
    async fn customers(&self, ctx: &Context<'_>) -> async_graphql::Result<Vec<CustomerNode>> {
        let context = ctx.data::<CatalogContext>()?;
        Ok(context.store.customers().iter().cloned().map(CustomerNode).collect())
    }
}

fn build_page_request(
    offset: Option<i32>,
    limit: Option<i32>,
    sort: Option<SortBy>,
) -> Result<PageRequest, CatalogError> {
    let offset = match offset {
        None => 0,
        Some(value) => usize::try_from(value).map_err(|_| {
            CatalogError::InvalidRequest(format!("offset must not be negative, got {value}"))
        })?,
    };
    let limit = match limit {
        None => None,
        Some(value) => Some(usize::try_from(value).map_err(|_| {
            CatalogError::InvalidRequest(format!("limit must not be negative, got {value}"))
        })?),
    };
    let sort = match sort {
        None => None,
        Some(sort_by) => Some(SortSpec::from_wire_fields(&sort_by.fields, sort_by.order.into())?),
    };
    Ok(PageRequest { offset, limit, sort })
}

fn error_code(err: &CatalogError) -> &'static str {
    match err {
        CatalogError::UnknownSortField { .. } => "UNKNOWN_SORT_FIELD",
        CatalogError::UnsortableField { .. } => "UNSORTABLE_FIELD",
        CatalogError::SortValueKindMismatch { .. } => "SORT_VALUE_KIND_MISMATCH",
        CatalogError::UnknownCustomer { .. } => "UNKNOWN_CUSTOMER",
        CatalogError::DuplicateId { .. } => "DUPLICATE_ID",
        CatalogError::InvalidRequest(_) => "INVALID_REQUEST",
        CatalogError::SnapshotIo(_) | CatalogError::SnapshotFormat(_) => "INTERNAL",
    }
}

fn to_graphql_error(err: &CatalogError) -> async_graphql::Error {
    let code = error_code(err);
    async_graphql::Error::new(err.to_string()).extend_with(|_, ext| ext.set("code", code))
}
