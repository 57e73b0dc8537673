//! Wire types shared by every resource: records, pages and page requests.

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Backend-assigned record identifier
pub type RecordId = i64;

/// The resource kinds exposed by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
  Lead,
  CustomerGroup,
  SalesOrder,
  Invoice,
  DeliveryNote,
  Payment,
}

impl ResourceKind {
  pub const ALL: [ResourceKind; 6] = [
    ResourceKind::Lead,
    ResourceKind::CustomerGroup,
    ResourceKind::SalesOrder,
    ResourceKind::Invoice,
    ResourceKind::DeliveryNote,
    ResourceKind::Payment,
  ];

  /// Collection path segment, also the prefix of every list cache key
  pub fn collection(self) -> &'static str {
    match self {
      ResourceKind::Lead => "leads",
      ResourceKind::CustomerGroup => "customer-groups",
      ResourceKind::SalesOrder => "sales-orders",
      ResourceKind::Invoice => "invoices",
      ResourceKind::DeliveryNote => "delivery-notes",
      ResourceKind::Payment => "payments",
    }
  }

  /// Singular name, the prefix of single-record cache keys
  pub fn singular(self) -> &'static str {
    match self {
      ResourceKind::Lead => "lead",
      ResourceKind::CustomerGroup => "customer-group",
      ResourceKind::SalesOrder => "sales-order",
      ResourceKind::Invoice => "invoice",
      ResourceKind::DeliveryNote => "delivery-note",
      ResourceKind::Payment => "payment",
    }
  }

  /// Human-readable plural for titles
  pub fn label(self) -> &'static str {
    match self {
      ResourceKind::Lead => "Leads",
      ResourceKind::CustomerGroup => "Customer Groups",
      ResourceKind::SalesOrder => "Sales Orders",
      ResourceKind::Invoice => "Invoices",
      ResourceKind::DeliveryNote => "Delivery Notes",
      ResourceKind::Payment => "Payments",
    }
  }

  /// Parse a kind from a collection name or a common short alias.
  pub fn parse(name: &str) -> Option<Self> {
    let name = name.trim().to_lowercase();
    Self::ALL.into_iter().find(|kind| {
      kind.collection() == name
        || kind.singular() == name
        || match kind {
          ResourceKind::CustomerGroup => name == "groups",
          ResourceKind::SalesOrder => name == "orders",
          ResourceKind::DeliveryNote => name == "deliveries",
          _ => false,
        }
    })
  }
}

impl fmt::Display for ResourceKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.collection())
  }
}

/// A backend-managed entity type.
///
/// The implementing type holds the domain fields only; it doubles as the
/// create payload, which therefore cannot carry an id.
pub trait Resource:
  Serialize + DeserializeOwned + Clone + fmt::Debug + PartialEq + Send + Sync + 'static
{
  /// Partial update payload; fields left as `None` are not sent.
  type Patch: Serialize
    + DeserializeOwned
    + Clone
    + fmt::Debug
    + Default
    + PartialEq
    + Send
    + Sync
    + 'static;

  const KIND: ResourceKind;

  /// Short label for a single record (e.g. the lead name)
  fn title(&self) -> String;
}

/// A persisted resource as returned by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", bound = "R: Resource")]
pub struct Record<R: Resource> {
  pub id: RecordId,
  #[serde(flatten)]
  pub fields: R,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub created_at: Option<DateTime<Utc>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub updated_at: Option<DateTime<Utc>>,
}

/// One page of a sorted collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
  pub content: Vec<T>,
  pub total_elements: u64,
  pub total_pages: u32,
  pub size: u32,
  /// Zero-based page index
  pub number: u32,
}

impl<T> Page<T> {
  pub fn is_empty(&self) -> bool {
    self.content.is_empty()
  }

  pub fn has_next(&self) -> bool {
    self.number.saturating_add(1) < self.total_pages
  }
}

impl<R: Resource> Page<Record<R>> {
  /// Check the pagination invariants the backend promises.
  pub fn is_consistent(&self) -> bool {
    let fits = self.content.len() <= self.size as usize;
    let in_range = self.total_elements == 0 || self.number < self.total_pages;
    let mut seen = HashSet::new();
    let unique = self.content.iter().all(|r| seen.insert(r.id));
    fits && in_range && unique
  }

  pub fn contains(&self, id: RecordId) -> bool {
    self.content.iter().any(|r| r.id == id)
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortDirection {
  #[default]
  Asc,
  Desc,
}

impl SortDirection {
  pub fn as_str(self) -> &'static str {
    match self {
      SortDirection::Asc => "ASC",
      SortDirection::Desc => "DESC",
    }
  }

  pub fn toggled(self) -> Self {
    match self {
      SortDirection::Asc => SortDirection::Desc,
      SortDirection::Desc => SortDirection::Asc,
    }
  }
}

/// Parameters of a list query
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageRequest {
  pub page_number: u32,
  pub page_size: u32,
  pub sort_field: String,
  pub direction: SortDirection,
}

impl PageRequest {
  /// Returns `None` when `page_size` is zero.
  pub fn new(
    page_number: u32,
    page_size: u32,
    sort_field: impl Into<String>,
    direction: SortDirection,
  ) -> Option<Self> {
    if page_size == 0 {
      return None;
    }
    Some(Self {
      page_number,
      page_size,
      sort_field: sort_field.into(),
      direction,
    })
  }

  /// First page sorted ascending by `sort_field`.
  pub fn first(page_size: u32, sort_field: impl Into<String>) -> Option<Self> {
    Self::new(0, page_size, sort_field, SortDirection::Asc)
  }

  pub fn next(&self) -> Self {
    Self {
      page_number: self.page_number.saturating_add(1),
      ..self.clone()
    }
  }

  pub fn previous(&self) -> Self {
    Self {
      page_number: self.page_number.saturating_sub(1),
      ..self.clone()
    }
  }

  /// Same query with the sort direction flipped, back on the first page.
  pub fn toggled(&self) -> Self {
    Self {
      page_number: 0,
      direction: self.direction.toggled(),
      ..self.clone()
    }
  }

  /// Query string pairs in the order the backend documents them
  pub fn query_pairs(&self) -> [(&'static str, String); 4] {
    [
      ("pageNumber", self.page_number.to_string()),
      ("pageSize", self.page_size.to_string()),
      ("direction", self.direction.as_str().to_string()),
      ("sortField", self.sort_field.clone()),
    ]
  }
}
