use std::cmp::Ordering;
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt::{Display, Formatter};
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64Mcg;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

pub const CUSTOMERS_SNAPSHOT_FILE: &str = "customers.json";
pub const POLICIES_SNAPSHOT_FILE: &str = "policies.json";

pub const DEFAULT_FIXTURE_CUSTOMERS: usize = 100;
pub const DEFAULT_FIXTURE_POLICIES: usize = 300;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("unknown sort field: {segment}")]
    UnknownSortField { segment: String },
    #[error("cannot sort by object type: {path}")]
    UnsortableField { path: String },
    #[error("sort values were not same type: {left} vs {right}")]
    SortValueKindMismatch { left: &'static str, right: &'static str },
    #[error("policy {policy} references unknown customer {customer}")]
    UnknownCustomer { policy: PolicyId, customer: CustomerId },
    #[error("duplicate {entity} id: {id}")]
    DuplicateId { entity: &'static str, id: String },
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("snapshot io error: {0}")]
    SnapshotIo(#[from] std::io::Error),
    #[error("snapshot format error: {0}")]
    SnapshotFormat(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct CustomerId(pub String);

impl CustomerId {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for CustomerId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PolicyId(pub String);

impl PolicyId {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for PolicyId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Millisecond-precision instant, the unit policy dates are exchanged in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Timestamp(pub i64);

impl Timestamp {
    #[must_use]
    pub const fn from_unix_millis(millis: i64) -> Self {
        Self(millis)
    }

    #[must_use]
    pub const fn from_unix_seconds(seconds: i64) -> Self {
        Self(seconds.saturating_mul(1000))
    }

    #[must_use]
    pub const fn as_unix_millis(self) -> i64 {
        self.0
    }

    /// Sub-millisecond precision is truncated toward zero.
    #[must_use]
    pub fn from_datetime(value: OffsetDateTime) -> Self {
        let millis = value.unix_timestamp_nanos() / 1_000_000;
        Self(i64::try_from(millis).unwrap_or(i64::MAX))
    }

    /// # Errors
    /// Returns [`CatalogError::InvalidRequest`] when the instant cannot be
    /// represented as an `OffsetDateTime`.
    pub fn to_datetime(self) -> Result<OffsetDateTime, CatalogError> {
        OffsetDateTime::from_unix_timestamp_nanos(i128::from(self.0).saturating_mul(1_000_000))
            .map_err(|err| {
                CatalogError::InvalidRequest(format!("timestamp {} is out of range: {err}", self.0))
            })
    }

    /// # Errors
    /// Returns [`CatalogError::InvalidRequest`] when `value` is not a valid
    /// RFC 3339 timestamp.
    pub fn parse_rfc3339(value: &str) -> Result<Self, CatalogError> {
        let parsed = OffsetDateTime::parse(value, &Rfc3339).map_err(|err| {
            CatalogError::InvalidRequest(format!("invalid RFC 3339 timestamp `{value}`: {err}"))
        })?;
        Ok(Self::from_datetime(parsed))
    }

    /// # Errors
    /// Returns [`CatalogError::InvalidRequest`] when the instant cannot be
    /// rendered as RFC 3339.
    pub fn to_rfc3339(self) -> Result<String, CatalogError> {
        self.to_datetime()?.format(&Rfc3339).map_err(|err| {
            CatalogError::InvalidRequest(format!("timestamp {} cannot be formatted: {err}", self.0))
        })
    }

    #[must_use]
    pub const fn saturating_add_millis(self, millis: i64) -> Self {
        Self(self.0.saturating_add(millis))
    }
}

impl Display for Timestamp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(rename_all = "snake_case")]
pub enum InsuranceType {
    Liability,
    Household,
    Health,
}

impl InsuranceType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Liability => "liability",
            Self::Household => "household",
            Self::Health => "health",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "liability" => Some(Self::Liability),
            "household" => Some(Self::Household),
            "health" => Some(Self::Health),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PolicyStatus {
    Active,
    Pending,
    Cancelled,
    DroppedOut,
}

impl PolicyStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Pending => "pending",
            Self::Cancelled => "cancelled",
            Self::DroppedOut => "dropped_out",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(Self::Active),
            "pending" => Some(Self::Pending),
            "cancelled" => Some(Self::Cancelled),
            "dropped_out" => Some(Self::DroppedOut),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct Customer {
    pub id: CustomerId,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Timestamp,
}

/// One insurance contract. References its customer by id; generated data
/// keeps `created_at <= start_date <= end_date`, the resolver does not
/// enforce it.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct Policy {
    pub id: PolicyId,
    pub customer_id: CustomerId,
    pub provider: String,
    pub insurance_type: InsuranceType,
    pub status: PolicyStatus,
    pub policy_number: String,
    pub start_date: Timestamp,
    pub end_date: Timestamp,
    pub created_at: Timestamp,
}

/// Serialized form shared by the fixture generator, snapshot files, and the
/// store loader.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Eq, PartialEq)]
pub struct Dataset {
    pub customers: Vec<Customer>,
    pub policies: Vec<Policy>,
}

impl Dataset {
    /// # Errors
    /// Returns [`CatalogError::DuplicateId`] on repeated customer or policy
    /// ids, or [`CatalogError::UnknownCustomer`] when a policy references a
    /// customer that is not part of the dataset.
    pub fn validate(&self) -> Result<(), CatalogError> {
        let mut customer_ids = HashSet::with_capacity(self.customers.len());
        for customer in &self.customers {
            if !customer_ids.insert(&customer.id) {
                return Err(CatalogError::DuplicateId {
                    entity: "customer",
                    id: customer.id.to_string(),
                });
            }
        }

        let mut policy_ids = HashSet::with_capacity(self.policies.len());
        for policy in &self.policies {
            if !policy_ids.insert(&policy.id) {
                return Err(CatalogError::DuplicateId {
                    entity: "policy",
                    id: policy.id.to_string(),
                });
            }
            if !customer_ids.contains(&policy.customer_id) {
                return Err(CatalogError::UnknownCustomer {
                    policy: policy.id.clone(),
                    customer: policy.customer_id.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Read-only policy collection loaded once at process start. Natural order
/// is the dataset's insertion order.
#[derive(Debug)]
pub struct PolicyStore {
    customers: Vec<Customer>,
    policies: Vec<Policy>,
    customer_index: HashMap<CustomerId, usize>,
}

impl PolicyStore {
    /// # Errors
    /// Propagates [`Dataset::validate`] failures; a store never holds
    /// duplicate ids or dangling customer references.
    pub fn from_dataset(dataset: Dataset) -> Result<Self, CatalogError> {
        dataset.validate()?;
        let customer_index = dataset
            .customers
            .iter()
            .enumerate()
            .map(|(index, customer)| (customer.id.clone(), index))
            .collect();
        Ok(Self { customers: dataset.customers, policies: dataset.policies, customer_index })
    }

    #[must_use]
    pub fn customer(&self, id: &CustomerId) -> Option<&Customer> {
        self.customer_index.get(id).and_then(|index| self.customers.get(*index))
    }

    #[must_use]
    pub fn customers(&self) -> &[Customer] {
        &self.customers
    }

    #[must_use]
    pub fn policies(&self) -> &[Policy] {
        &self.policies
    }

    #[must_use]
    pub fn customer_count(&self) -> usize {
        self.customers.len()
    }

    #[must_use]
    pub fn policy_count(&self) -> usize {
        self.policies.len()
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }
}

/// Closed set of sortable fields. Wire paths use the camelCase field names
/// of the query schema; customer fields are two-segment paths such as
/// `customer.lastName`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    PolicyNumber,
    Provider,
    InsuranceType,
    Status,
    StartDate,
    EndDate,
    CreatedAt,
    CustomerFirstName,
    CustomerLastName,
    CustomerDateOfBirth,
}

impl SortField {
    #[must_use]
    pub fn wire_path(self) -> &'static str {
        match self {
            Self::PolicyNumber => "policyNumber",
            Self::Provider => "provider",
            Self::InsuranceType => "insuranceType",
            Self::Status => "status",
            Self::StartDate => "startDate",
            Self::EndDate => "endDate",
            Self::CreatedAt => "createdAt",
            Self::CustomerFirstName => "customer.firstName",
            Self::CustomerLastName => "customer.lastName",
            Self::CustomerDateOfBirth => "customer.dateOfBirth",
        }
    }

    fn parse_policy_segment(segment: &str) -> Option<Self> {
        match segment {
            "policyNumber" => Some(Self::PolicyNumber),
            "provider" => Some(Self::Provider),
            "insuranceType" => Some(Self::InsuranceType),
            "status" => Some(Self::Status),
            "startDate" => Some(Self::StartDate),
            "endDate" => Some(Self::EndDate),
            "createdAt" => Some(Self::CreatedAt),
            _ => None,
        }
    }

    fn parse_customer_segment(segment: &str) -> Option<Self> {
        match segment {
            "firstName" => Some(Self::CustomerFirstName),
            "lastName" => Some(Self::CustomerLastName),
            "dateOfBirth" => Some(Self::CustomerDateOfBirth),
            _ => None,
        }
    }

    /// Extract the comparable scalar this field designates. Enum fields
    /// compare by their serialized name, date fields by epoch millisecond.
    ///
    /// # Errors
    /// Returns [`CatalogError::UnknownCustomer`] when the policy's customer
    /// reference does not resolve in `store`.
    pub fn value<'a>(
        self,
        policy: &'a Policy,
        store: &'a PolicyStore,
    ) -> Result<SortValue<'a>, CatalogError> {
        let value = match self {
            Self::PolicyNumber => SortValue::Text(&policy.policy_number),
            Self::Provider => SortValue::Text(&policy.provider),
            Self::InsuranceType => SortValue::Text(policy.insurance_type.as_str()),
            Self::Status => SortValue::Text(policy.status.as_str()),
            Self::StartDate => SortValue::Number(policy.start_date.as_unix_millis()),
            Self::EndDate => SortValue::Number(policy.end_date.as_unix_millis()),
            Self::CreatedAt => SortValue::Number(policy.created_at.as_unix_millis()),
            Self::CustomerFirstName => SortValue::Text(&customer_of(policy, store)?.first_name),
            Self::CustomerLastName => SortValue::Text(&customer_of(policy, store)?.last_name),
            Self::CustomerDateOfBirth => {
                SortValue::Number(customer_of(policy, store)?.date_of_birth.as_unix_millis())
            }
        };
        Ok(value)
    }
}

fn customer_of<'a>(policy: &Policy, store: &'a PolicyStore) -> Result<&'a Customer, CatalogError> {
    store.customer(&policy.customer_id).ok_or_else(|| CatalogError::UnknownCustomer {
        policy: policy.id.clone(),
        customer: policy.customer_id.clone(),
    })
}

/// Composite ordering request: every field participates, ties flow to the
/// next field in the list, and `order` reverses the whole composite.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Hash)]
pub struct SortSpec {
    pub fields: Vec<SortField>,
    pub order: SortOrder,
}

impl SortSpec {
    #[must_use]
    pub fn new(fields: Vec<SortField>, order: SortOrder) -> Self {
        Self { fields, order }
    }

    /// Parse the wire `fields` list. The list is segmented greedily:
    /// `customer` consumes the following element as its sub-field, every
    /// other element is a one-segment policy field.
    ///
    /// # Errors
    /// Returns [`CatalogError::InvalidRequest`] on an empty list,
    /// [`CatalogError::UnsortableField`] when a path stops at the customer
    /// object itself, and [`CatalogError::UnknownSortField`] for segments
    /// that name no sortable field.
    pub fn from_wire_fields(fields: &[String], order: SortOrder) -> Result<Self, CatalogError> {
        if fields.is_empty() {
            return Err(CatalogError::InvalidRequest(
                "sort fields must not be empty".to_string(),
            ));
        }

        let mut parsed = Vec::with_capacity(fields.len());
        let mut index = 0;
        while index < fields.len() {
            let segment = fields[index].as_str();
            if segment == "customer" {
                let Some(sub_segment) = fields.get(index + 1) else {
                    return Err(CatalogError::UnsortableField { path: segment.to_string() });
                };
                let Some(field) = SortField::parse_customer_segment(sub_segment) else {
                    return Err(CatalogError::UnknownSortField {
                        segment: format!("customer.{sub_segment}"),
                    });
                };
                parsed.push(field);
                index += 2;
            } else {
                let Some(field) = SortField::parse_policy_segment(segment) else {
                    return Err(CatalogError::UnknownSortField { segment: segment.to_string() });
                };
                parsed.push(field);
                index += 1;
            }
        }
        Ok(Self { fields: parsed, order })
    }
}

/// Scalar extracted from one policy for ordering.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum SortValue<'a> {
    Number(i64),
    Text(&'a str),
}

impl SortValue<'_> {
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Number(_) => "number",
            Self::Text(_) => "text",
        }
    }

    /// Numbers compare by signed value, text lexicographically by code
    /// point.
    ///
    /// # Errors
    /// Returns [`CatalogError::SortValueKindMismatch`] when the operands are
    /// of different kinds.
    pub fn compare(lhs: &Self, rhs: &Self) -> Result<Ordering, CatalogError> {
        match (lhs, rhs) {
            (Self::Number(left), Self::Number(right)) => Ok(left.cmp(right)),
            (Self::Text(left), Self::Text(right)) => Ok(left.cmp(right)),
            _ => Err(CatalogError::SortValueKindMismatch { left: lhs.kind(), right: rhs.kind() }),
        }
    }
}

/// Cache key: the full field list plus direction, never a collapsed suffix.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct SortKey {
    fields: Vec<SortField>,
    order: SortOrder,
}

impl SortKey {
    #[must_use]
    pub fn of(spec: &SortSpec) -> Self {
        Self { fields: spec.fields.clone(), order: spec.order }
    }
}

/// Bounded LRU of sorted permutations, owned by the serving context and
/// shared across requests. One lock guards the check-compute-insert path;
/// a miss holds it for the duration of the sort. Entries are index
/// permutations into one store's policy slice, so a cache is only
/// meaningful paired with the store it was filled from.
#[derive(Debug)]
pub struct SortCache {
    capacity: usize,
    inner: Mutex<SortCacheInner>,
}

#[derive(Debug, Default)]
struct SortCacheInner {
    entries: HashMap<SortKey, Arc<[u32]>>,
    recency: VecDeque<SortKey>,
}

impl SortCacheInner {
    fn touch(&mut self, key: &SortKey) {
        self.recency.retain(|existing| existing != key);
        self.recency.push_back(key.clone());
    }
}

impl SortCache {
    /// # Errors
    /// Returns [`CatalogError::InvalidRequest`] for a zero capacity.
    pub fn new(capacity: usize) -> Result<Self, CatalogError> {
        if capacity == 0 {
            return Err(CatalogError::InvalidRequest(
                "sort cache capacity must be at least 1".to_string(),
            ));
        }
        Ok(Self { capacity, inner: Mutex::new(SortCacheInner::default()) })
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cached permutation for `key`, refreshing its recency on a hit.
    #[must_use]
    pub fn lookup(&self, key: &SortKey) -> Option<Arc<[u32]>> {
        let mut inner = self.lock();
        let permutation = inner.entries.get(key).cloned()?;
        inner.touch(key);
        Some(permutation)
    }

    /// Cached permutation for `key`, computing and storing it on first use.
    /// At capacity the least recently used entry is evicted.
    ///
    /// # Errors
    /// Propagates the `compute` error; nothing is stored in that case.
    pub fn get_or_try_insert_with<F>(
        &self,
        key: &SortKey,
        compute: F,
    ) -> Result<Arc<[u32]>, CatalogError>
    where
        F: FnOnce() -> Result<Vec<u32>, CatalogError>,
    {
        let mut inner = self.lock();
        if let Some(permutation) = inner.entries.get(key).cloned() {
            inner.touch(key);
            return Ok(permutation);
        }

        let permutation: Arc<[u32]> = compute()?.into();
        while inner.entries.len() >= self.capacity {
            let Some(evicted) = inner.recency.pop_front() else {
                break;
            };
            inner.entries.remove(&evicted);
        }
        inner.entries.insert(key.clone(), Arc::clone(&permutation));
        inner.touch(key);
        Ok(permutation)
    }

    fn lock(&self) -> MutexGuard<'_, SortCacheInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Inputs of one page resolution. `limit` defaults to the collection size,
/// an absent `sort` returns the natural store order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Eq, PartialEq)]
pub struct PageRequest {
    pub offset: usize,
    pub limit: Option<usize>,
    pub sort: Option<SortSpec>,
}

/// One resolved page. `total` counts the whole collection before slicing;
/// `has_next_page` is true exactly when the window stops short of the end.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct PolicyPage {
    pub policies: Vec<Policy>,
    pub total: usize,
    pub has_next_page: bool,
}

/// Resolve one page of policies under an optional composite sort.
///
/// A sorted request reuses the cached permutation for its full
/// field-list-plus-order key; the first request per key sorts once and
/// stores the result. The window `[offset, offset + limit)` is clamped to
/// the collection, so an out-of-range window yields a short or empty page,
/// never an error. Ties keep natural store order.
///
/// # Errors
/// Returns [`CatalogError::InvalidRequest`] for an empty sort field list,
/// or the field extraction error when a sort field cannot be read. A failed
/// request produces no partial page and no cache entry.
pub fn resolve_policy_page(
    store: &PolicyStore,
    cache: &SortCache,
    request: &PageRequest,
) -> Result<PolicyPage, CatalogError> {
    let total = store.policy_count();
    let limit = request.limit.unwrap_or(total);

    let policies = match &request.sort {
        None => page_window(store.policies(), request.offset, limit).to_vec(),
        Some(spec) => {
            if spec.fields.is_empty() {
                return Err(CatalogError::InvalidRequest(
                    "sort fields must not be empty".to_string(),
                ));
            }
            let key = SortKey::of(spec);
            let permutation =
                cache.get_or_try_insert_with(&key, || sorted_permutation(store, spec))?;
            let mut page = Vec::with_capacity(limit.min(total));
            for index in page_window(&permutation, request.offset, limit) {
                let position = usize::try_from(*index).unwrap_or(usize::MAX);
                if let Some(policy) = store.policies().get(position) {
                    page.push(policy.clone());
                }
            }
            page
        }
    };

    Ok(PolicyPage {
        policies,
        total,
        has_next_page: request.offset.saturating_add(limit) < total,
    })
}

fn page_window<T>(items: &[T], offset: usize, limit: usize) -> &[T] {
    let start = offset.min(items.len());
    let end = offset.saturating_add(limit).min(items.len());
    &items[start..end]
}

struct SortRow<'a> {
    index: u32,
    keys: Vec<SortValue<'a>>,
}

fn sorted_permutation(store: &PolicyStore, spec: &SortSpec) -> Result<Vec<u32>, CatalogError> {
    let policies = store.policies();
    let mut rows = Vec::with_capacity(policies.len());
    for (position, policy) in policies.iter().enumerate() {
        let index = u32::try_from(position).map_err(|_| {
            CatalogError::InvalidRequest(
                "policy collection exceeds the sortable index range".to_string(),
            )
        })?;
        let mut keys = Vec::with_capacity(spec.fields.len());
        for field in &spec.fields {
            keys.push(field.value(policy, store)?);
        }
        rows.push(SortRow { index, keys });
    }

    rows.sort_by(|lhs, rhs| {
        let ordering = composite_ordering(&lhs.keys, &rhs.keys);
        match spec.order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    });

    Ok(rows.into_iter().map(|row| row.index).collect())
}

// Kinds are uniform per field position by construction, so the mismatch
// arm cannot be reached from here.
fn composite_ordering(lhs: &[SortValue<'_>], rhs: &[SortValue<'_>]) -> Ordering {
    for (left, right) in lhs.iter().zip(rhs) {
        let ordering = SortValue::compare(left, right).unwrap_or(Ordering::Equal);
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

const FIRST_NAMES: &[&str] = &[
    "Alice", "Anton", "Bea", "Bruno", "Carl", "Clara", "David", "Dora", "Elias", "Emma", "Felix",
    "Frida", "Georg", "Greta", "Hanna", "Henry", "Ida", "Ivo", "Jonas", "Julia", "Karl", "Katrin",
    "Lena", "Lukas", "Marie", "Moritz", "Nils", "Nora", "Olivia", "Paul", "Quentin", "Rosa",
    "Stefan", "Tilda", "Ulrich", "Vera", "Walter", "Xenia", "Yann", "Zoe",
];

const LAST_NAMES: &[&str] = &[
    "Albrecht", "Ames", "Becker", "Brandt", "Cole", "Conrad", "Decker", "Dietrich", "Easter",
    "Ebert", "Falk", "Fredrickson", "Graf", "Gruber", "Hartmann", "Hoffmann", "Ibsen", "Imhof",
    "Jansen", "Jung", "Keller", "Krause", "Lang", "Lorenz", "Mertens", "Meyer", "Neumann",
    "Norden", "Ostermann", "Otten", "Prieto", "Quandt", "Richter", "Schmidt", "Tanner", "Unger",
    "Vogel", "Wagner", "Young", "Zimmermann",
];

const PROVIDERS: &[&str] = &[
    "AIG",
    "AXA",
    "Allianz",
    "Aviva",
    "Blue Cross",
    "Debeka",
    "Ergo",
    "Generali",
    "Gothaer",
    "MetLife",
    "Signal Iduna",
    "Zurich",
];

const INSURANCE_TYPES: [InsuranceType; 3] =
    [InsuranceType::Liability, InsuranceType::Household, InsuranceType::Health];

const OPEN_STATUSES: [PolicyStatus; 2] = [PolicyStatus::Active, PolicyStatus::DroppedOut];

// 1950-01-01T00:00:00Z and 2003-01-01T00:00:00Z; birth dates are drawn
// from this half-open range.
const BIRTH_RANGE_START: Timestamp = Timestamp::from_unix_seconds(-631_152_000);
const BIRTH_RANGE_END: Timestamp = Timestamp::from_unix_seconds(1_041_379_200);

// Twenty years including leap days, the longest span between consecutive
// policy dates.
const MAX_FORWARD_SPAN_MS: i64 = 631_152_000_000;

/// Parameters of one deterministic dataset generation. Identical configs
/// produce byte-identical datasets.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq)]
pub struct FixtureConfig {
    pub seed: u64,
    pub now: Timestamp,
    pub customers: usize,
    pub policies: usize,
}

impl FixtureConfig {
    #[must_use]
    pub fn new(seed: u64, now: Timestamp) -> Self {
        Self {
            seed,
            now,
            customers: DEFAULT_FIXTURE_CUSTOMERS,
            policies: DEFAULT_FIXTURE_POLICIES,
        }
    }
}

struct FixtureRng {
    rng: Pcg64Mcg,
}

impl FixtureRng {
    fn new(seed: u64) -> Self {
        Self { rng: Pcg64Mcg::seed_from_u64(seed) }
    }

    fn pick<'a, T>(&mut self, items: &'a [T]) -> &'a T {
        let index = self.rng.gen_range(0..items.len());
        &items[index]
    }

    /// Uniform draw from `[start, end)`; callers guarantee `start < end`.
    fn millis_between(&mut self, start: Timestamp, end: Timestamp) -> Timestamp {
        Timestamp(self.rng.gen_range(start.0..end.0))
    }

    fn forward_span(&mut self) -> i64 {
        self.rng.gen_range(1..=MAX_FORWARD_SPAN_MS)
    }
}

/// Generate a reproducible synthetic dataset.
///
/// Every date derives from the explicit `config.now` rather than the wall
/// clock: `created_at` falls between the customer's birth date and `now`,
/// `start_date` and `end_date` are increasing forward spans of up to
/// twenty years, and the status compares `now` against that window
/// (`Pending` before it, `Cancelled` after it, otherwise a draw between
/// `Active` and `DroppedOut`). Policy numbers are the decimal generation
/// sequence starting at 1.
///
/// # Errors
/// Returns [`CatalogError::InvalidRequest`] when policies are requested
/// without customers, or when `now` predates the birth-date range.
pub fn generate_dataset(config: &FixtureConfig) -> Result<Dataset, CatalogError> {
    if config.policies > 0 && config.customers == 0 {
        return Err(CatalogError::InvalidRequest(
            "policies require at least one customer".to_string(),
        ));
    }
    if config.now < BIRTH_RANGE_END {
        return Err(CatalogError::InvalidRequest(
            "fixture now must not predate the customer birth-date range".to_string(),
        ));
    }

    let mut rng = FixtureRng::new(config.seed);

    let mut customers = Vec::with_capacity(config.customers);
    for sequence in 1..=config.customers {
        customers.push(Customer {
            id: CustomerId::new(format!("c-{sequence:06}")),
            first_name: (*rng.pick(FIRST_NAMES)).to_string(),
            last_name: (*rng.pick(LAST_NAMES)).to_string(),
            date_of_birth: rng.millis_between(BIRTH_RANGE_START, BIRTH_RANGE_END),
        });
    }

    let mut policies = Vec::with_capacity(config.policies);
    for sequence in 1..=config.policies {
        let customer = rng.pick(&customers);
        let created_at = rng.millis_between(customer.date_of_birth, config.now);
        let start_date = created_at.saturating_add_millis(rng.forward_span());
        let end_date = start_date.saturating_add_millis(rng.forward_span());
        let status = if config.now < start_date {
            PolicyStatus::Pending
        } else if config.now > end_date {
            PolicyStatus::Cancelled
        } else {
            *rng.pick(&OPEN_STATUSES)
        };
        policies.push(Policy {
            id: PolicyId::new(format!("p-{sequence:06}")),
            customer_id: customer.id.clone(),
            provider: (*rng.pick(PROVIDERS)).to_string(),
            insurance_type: *rng.pick(&INSURANCE_TYPES),
            status,
            policy_number: sequence.to_string(),
            start_date,
            end_date,
            created_at,
        });
    }

    Ok(Dataset { customers, policies })
}

/// The bundled demo dataset: four customers, seven policies, fixed dates.
/// The service serves it when started without a snapshot or seed.
#[must_use]
pub fn demo_dataset() -> Dataset {
    let customers = vec![
        Customer {
            id: CustomerId::new("c-000001"),
            first_name: "Alice".to_string(),
            last_name: "Ames".to_string(),
            // 1970-08-02
            date_of_birth: Timestamp::from_unix_seconds(18_403_200),
        },
        Customer {
            id: CustomerId::new("c-000002"),
            first_name: "Bob".to_string(),
            last_name: "Decker".to_string(),
            // 2000-09-12
            date_of_birth: Timestamp::from_unix_seconds(968_716_800),
        },
        Customer {
            id: CustomerId::new("c-000003"),
            first_name: "Carol".to_string(),
            last_name: "Easter".to_string(),
            // 1990-05-12
            date_of_birth: Timestamp::from_unix_seconds(642_470_400),
        },
        Customer {
            id: CustomerId::new("c-000004"),
            first_name: "Dave".to_string(),
            last_name: "Fredrickson".to_string(),
            // 2001-03-17
            date_of_birth: Timestamp::from_unix_seconds(984_787_200),
        },
    ];

    let policies = vec![
        Policy {
            id: PolicyId::new("p-000001"),
            customer_id: CustomerId::new("c-000001"),
            provider: "Allianz".to_string(),
            insurance_type: InsuranceType::Liability,
            status: PolicyStatus::Active,
            policy_number: "a1".to_string(),
            // 2021-01-06 / 2024-01-06 / 2021-01-01
            start_date: Timestamp::from_unix_seconds(1_609_891_200),
            end_date: Timestamp::from_unix_seconds(1_704_499_200),
            created_at: Timestamp::from_unix_seconds(1_609_459_200),
        },
        Policy {
            id: PolicyId::new("p-000002"),
            customer_id: CustomerId::new("c-000002"),
            provider: "AXA".to_string(),
            insurance_type: InsuranceType::Health,
            status: PolicyStatus::Cancelled,
            policy_number: "b2".to_string(),
            // 2018-02-12 / 2020-02-12 / 2018-01-01
            start_date: Timestamp::from_unix_seconds(1_518_393_600),
            end_date: Timestamp::from_unix_seconds(1_581_465_600),
            created_at: Timestamp::from_unix_seconds(1_514_764_800),
        },
        Policy {
            id: PolicyId::new("p-000003"),
            customer_id: CustomerId::new("c-000003"),
            provider: "Allianz".to_string(),
            insurance_type: InsuranceType::Household,
            status: PolicyStatus::DroppedOut,
            policy_number: "c3".to_string(),
            // 2017-04-21 / 2020-01-04 / 2016-04-11
            start_date: Timestamp::from_unix_seconds(1_492_732_800),
            end_date: Timestamp::from_unix_seconds(1_578_096_000),
            created_at: Timestamp::from_unix_seconds(1_460_332_800),
        },
        Policy {
            id: PolicyId::new("p-000004"),
            customer_id: CustomerId::new("c-000003"),
            provider: "Allianz".to_string(),
            insurance_type: InsuranceType::Health,
            status: PolicyStatus::Active,
            policy_number: "c4".to_string(),
            // 2015-09-20 / 2028-09-20 / 2015-01-20
            start_date: Timestamp::from_unix_seconds(1_442_707_200),
            end_date: Timestamp::from_unix_seconds(1_853_020_800),
            created_at: Timestamp::from_unix_seconds(1_421_712_000),
        },
        Policy {
            id: PolicyId::new("p-000005"),
            customer_id: CustomerId::new("c-000004"),
            provider: "Blue Cross".to_string(),
            insurance_type: InsuranceType::Health,
            status: PolicyStatus::Cancelled,
            policy_number: "d4".to_string(),
            // 1958-07-03 / 1959-07-03 / 1957-07-03
            start_date: Timestamp::from_unix_seconds(-362_880_000),
            end_date: Timestamp::from_unix_seconds(-331_344_000),
            created_at: Timestamp::from_unix_seconds(-394_416_000),
        },
        Policy {
            id: PolicyId::new("p-000006"),
            customer_id: CustomerId::new("c-000001"),
            provider: "Allianz".to_string(),
            insurance_type: InsuranceType::Liability,
            status: PolicyStatus::Pending,
            policy_number: "a2".to_string(),
            // 2012-06-29 / 2014-08-19 / 2008-03-27
            start_date: Timestamp::from_unix_seconds(1_340_928_000),
            end_date: Timestamp::from_unix_seconds(1_408_406_400),
            created_at: Timestamp::from_unix_seconds(1_206_576_000),
        },
        Policy {
            id: PolicyId::new("p-000007"),
            customer_id: CustomerId::new("c-000002"),
            provider: "AXA".to_string(),
            insurance_type: InsuranceType::Health,
            status: PolicyStatus::Pending,
            policy_number: "b3".to_string(),
            // 2018-05-08 / 2020-05-26 / 2018-01-01
            start_date: Timestamp::from_unix_seconds(1_525_737_600),
            end_date: Timestamp::from_unix_seconds(1_590_451_200),
            created_at: Timestamp::from_unix_seconds(1_514_764_800),
        },
    ];

    Dataset { customers, policies }
}

/// Write `dataset` as the two snapshot files under `dir`, creating the
/// directory if needed.
///
/// # Errors
/// Returns [`CatalogError::SnapshotIo`] on filesystem failures or
/// [`CatalogError::SnapshotFormat`] on serialization failures.
pub fn write_snapshot(dir: &Path, dataset: &Dataset) -> Result<(), CatalogError> {
    fs::create_dir_all(dir)?;
    let customers = serde_json::to_vec_pretty(&dataset.customers)?;
    fs::write(dir.join(CUSTOMERS_SNAPSHOT_FILE), customers)?;
    let policies = serde_json::to_vec_pretty(&dataset.policies)?;
    fs::write(dir.join(POLICIES_SNAPSHOT_FILE), policies)?;
    Ok(())
}

/// Load and validate a snapshot directory written by [`write_snapshot`].
///
/// # Errors
/// Returns the read or parse failure, or the [`Dataset::validate`] error
/// for snapshots with duplicate ids or dangling customer references.
pub fn read_snapshot(dir: &Path) -> Result<Dataset, CatalogError> {
    let customers_body = fs::read(dir.join(CUSTOMERS_SNAPSHOT_FILE))?;
    let customers: Vec<Customer> = serde_json::from_slice(&customers_body)?;
    let policies_body = fs::read(dir.join(POLICIES_SNAPSHOT_FILE))?;
    let policies: Vec<Policy> = serde_json::from_slice(&policies_body)?;
    let dataset = Dataset { customers, policies };
    dataset.validate()?;
    Ok(dataset)
}

/// Hex SHA-256 over the canonical JSON of `dataset`. Two generation runs
/// agree on the fingerprint exactly when they produced identical datasets.
///
/// # Errors
/// Returns [`CatalogError::SnapshotFormat`] when serialization fails.
pub fn dataset_fingerprint(dataset: &Dataset) -> Result<String, CatalogError> {
    let canonical = serde_json::to_vec(dataset)?;
    let mut hasher = Sha256::new();
    hasher.update(&canonical);
    Ok(hex::encode(hasher.finalize()))
}
