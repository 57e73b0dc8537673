//! Table columns and form fields for each resource.
//!
//! Fields are addressed by their JSON path in the serialized record, so one
//! generic implementation renders cells, fills forms and turns edited form
//! values back into create or patch payloads.

use chrono::NaiveDate;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::api::resources::{CustomerGroup, DeliveryNote, Invoice, Lead, Payment, SalesOrder};
use crate::api::{Record, Resource};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
  Text,
  Integer,
  Decimal,
  /// ISO date, `YYYY-MM-DD`
  Date,
  /// yes/no
  Flag,
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
  pub label: &'static str,
  pub path: &'static [&'static str],
  pub kind: FieldKind,
  pub required: bool,
}

const fn field(label: &'static str, path: &'static [&'static str], kind: FieldKind) -> FieldSpec {
  FieldSpec {
    label,
    path,
    kind,
    required: true,
  }
}

const fn optional(label: &'static str, path: &'static [&'static str], kind: FieldKind) -> FieldSpec {
  FieldSpec {
    label,
    path,
    kind,
    required: false,
  }
}

#[derive(Debug, Clone, Copy)]
pub struct Column {
  pub header: &'static str,
  pub path: &'static [&'static str],
  pub width: u16,
}

const fn column(header: &'static str, path: &'static [&'static str], width: u16) -> Column {
  Column {
    header,
    path,
    width,
  }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormError {
  #[error("{field} is required")]
  Missing { field: &'static str },
  #[error("{field}: {reason}")]
  Invalid { field: &'static str, reason: String },
  #[error("invalid payload: {0}")]
  Payload(String),
}

/// Describes how a resource is shown in tables and edited in forms.
pub trait Schema: Resource {
  const COLUMNS: &'static [Column];
  const FIELDS: &'static [FieldSpec];
}

/// Table cells for a record, id first.
pub fn cells<R: Schema>(record: &Record<R>) -> Vec<String> {
  let value = serde_json::to_value(&record.fields).unwrap_or(Value::Null);
  std::iter::once(record.id.to_string())
    .chain(R::COLUMNS.iter().map(|c| display(lookup(&value, c.path))))
    .collect()
}

/// Current values of every form field, as shown in the edit dialog.
pub fn form_values<R: Schema>(fields: &R) -> Vec<String> {
  let value = serde_json::to_value(fields).unwrap_or(Value::Null);
  R::FIELDS
    .iter()
    .map(|f| display(lookup(&value, f.path)))
    .collect()
}

/// Build a create payload from form input.
pub fn parse_form<R: Schema>(values: &[String]) -> Result<R, FormError> {
  let mut object = Value::Object(Map::new());
  for (spec, raw) in R::FIELDS.iter().zip(values) {
    if let Some(value) = parse_field(spec, raw)? {
      insert(&mut object, spec.path, value);
    }
  }
  serde_json::from_value(object).map_err(|e| FormError::Payload(e.to_string()))
}

/// Build a patch holding only the fields that differ from `original`.
///
/// Nested objects are sent whole when any of their fields changed. A cleared
/// optional text field is sent as an empty string so the backend clears it.
pub fn patch_from_form<R: Schema>(original: &R, values: &[String]) -> Result<R::Patch, FormError> {
  let updated = serde_json::to_value(parse_form::<R>(values)?)
    .map_err(|e| FormError::Payload(e.to_string()))?;
  let before = form_values(original);

  let mut patch = Map::new();
  for ((spec, raw), old) in R::FIELDS.iter().zip(values).zip(&before) {
    if raw.trim() == old.as_str() {
      continue;
    }
    let top = spec.path[0];
    let value = match updated.get(top) {
      Some(value) => value.clone(),
      None => cleared(spec)?,
    };
    patch.insert(top.to_string(), value);
  }

  serde_json::from_value(Value::Object(patch)).map_err(|e| FormError::Payload(e.to_string()))
}

/// Label/value rows for the detail panel.
pub fn detail_rows<R: Schema>(fields: &R) -> Vec<(&'static str, String)> {
  R::FIELDS
    .iter()
    .map(|f| f.label)
    .zip(form_values(fields))
    .collect()
}

/// Value sent for an optional field the user emptied
fn cleared(spec: &FieldSpec) -> Result<Value, FormError> {
  match spec.kind {
    FieldKind::Text => Ok(Value::String(String::new())),
    _ => Err(FormError::Invalid {
      field: spec.label,
      reason: "cannot be cleared".to_string(),
    }),
  }
}

fn lookup<'a>(value: &'a Value, path: &[&str]) -> &'a Value {
  path.iter().fold(value, |v, key| v.get(key).unwrap_or(&Value::Null))
}

fn display(value: &Value) -> String {
  match value {
    Value::Null => String::new(),
    Value::String(s) => s.clone(),
    Value::Bool(true) => "yes".to_string(),
    Value::Bool(false) => "no".to_string(),
    other => other.to_string(),
  }
}

fn insert(target: &mut Value, path: &[&str], value: Value) {
  let Some((last, parents)) = path.split_last() else {
    return;
  };
  let mut current = target;
  for key in parents {
    let Value::Object(map) = current else {
      return;
    };
    current = map
      .entry(key.to_string())
      .or_insert_with(|| Value::Object(Map::new()));
  }
  if let Value::Object(map) = current {
    map.insert(last.to_string(), value);
  }
}

/// Parse one raw field; `None` means "leave out and let defaults apply".
fn parse_field(spec: &FieldSpec, raw: &str) -> Result<Option<Value>, FormError> {
  let raw = raw.trim();
  if raw.is_empty() {
    return if spec.required {
      Err(FormError::Missing { field: spec.label })
    } else {
      Ok(None)
    };
  }

  let invalid = |reason: &str| FormError::Invalid {
    field: spec.label,
    reason: reason.to_string(),
  };

  let value = match spec.kind {
    FieldKind::Text => Value::String(raw.to_string()),
    FieldKind::Integer => raw
      .parse::<i64>()
      .map(Value::from)
      .map_err(|_| invalid("expected a whole number"))?,
    FieldKind::Decimal => raw
      .parse::<f64>()
      .ok()
      .and_then(serde_json::Number::from_f64)
      .map(Value::Number)
      .ok_or_else(|| invalid("expected a number"))?,
    FieldKind::Date => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
      .map(|d| Value::String(d.format("%Y-%m-%d").to_string()))
      .map_err(|_| invalid("expected a date like 2024-01-31"))?,
    FieldKind::Flag => match raw.to_lowercase().as_str() {
      "yes" | "y" | "true" | "1" => Value::Bool(true),
      "no" | "n" | "false" | "0" => Value::Bool(false),
      _ => return Err(invalid("expected yes or no")),
    },
  };
  Ok(Some(value))
}

// ============================================================================
// Per-resource schemas
// ============================================================================

impl Schema for Lead {
  const COLUMNS: &'static [Column] = &[
    column("Name", &["leadName"], 22),
    column("Source", &["leadSource"], 10),
    column("Status", &["leadStatus"], 12),
    column("Owner", &["leadOwner"], 14),
    column("Territory", &["territory"], 10),
    column("Rating", &["leadRating"], 6),
  ];
  const FIELDS: &'static [FieldSpec] = &[
    field("Name", &["leadName"], FieldKind::Text),
    field("Source", &["leadSource"], FieldKind::Text),
    optional("Phone", &["contactInfo", "phone"], FieldKind::Text),
    optional("Email", &["contactInfo", "email"], FieldKind::Text),
    field("Status", &["leadStatus"], FieldKind::Text),
    field("Owner", &["leadOwner"], FieldKind::Text),
    optional("Territory", &["territory"], FieldKind::Text),
    optional("Rating", &["leadRating"], FieldKind::Integer),
  ];
}

impl Schema for CustomerGroup {
  const COLUMNS: &'static [Column] = &[
    column("Name", &["name"], 24),
    column("Discount %", &["discountPercent"], 10),
    column("Active", &["active"], 6),
    column("Description", &["description"], 40),
  ];
  const FIELDS: &'static [FieldSpec] = &[
    field("Name", &["name"], FieldKind::Text),
    optional("Description", &["description"], FieldKind::Text),
    optional("Discount %", &["discountPercent"], FieldKind::Decimal),
    optional("Active", &["active"], FieldKind::Flag),
  ];
}

impl Schema for SalesOrder {
  const COLUMNS: &'static [Column] = &[
    column("Order", &["orderNumber"], 12),
    column("Customer", &["customerName"], 24),
    column("Date", &["orderDate"], 10),
    column("Status", &["status"], 12),
    column("Total", &["totalAmount"], 12),
  ];
  const FIELDS: &'static [FieldSpec] = &[
    field("Order number", &["orderNumber"], FieldKind::Text),
    field("Customer", &["customerName"], FieldKind::Text),
    field("Order date", &["orderDate"], FieldKind::Date),
    field("Status", &["status"], FieldKind::Text),
    optional("Total", &["totalAmount"], FieldKind::Decimal),
  ];
}

impl Schema for Invoice {
  const COLUMNS: &'static [Column] = &[
    column("Invoice", &["invoiceNumber"], 12),
    column("Customer", &["customerName"], 24),
    column("Issued", &["issueDate"], 10),
    column("Due", &["dueDate"], 10),
    column("Status", &["status"], 10),
    column("Amount", &["amount"], 12),
  ];
  const FIELDS: &'static [FieldSpec] = &[
    field("Invoice number", &["invoiceNumber"], FieldKind::Text),
    field("Customer", &["customerName"], FieldKind::Text),
    field("Issue date", &["issueDate"], FieldKind::Date),
    field("Due date", &["dueDate"], FieldKind::Date),
    field("Status", &["status"], FieldKind::Text),
    optional("Amount", &["amount"], FieldKind::Decimal),
  ];
}

impl Schema for DeliveryNote {
  const COLUMNS: &'static [Column] = &[
    column("Delivery", &["deliveryNumber"], 12),
    column("Order", &["orderNumber"], 12),
    column("Customer", &["customerName"], 24),
    column("Date", &["deliveryDate"], 10),
    column("Status", &["status"], 12),
  ];
  const FIELDS: &'static [FieldSpec] = &[
    field("Delivery number", &["deliveryNumber"], FieldKind::Text),
    field("Order number", &["orderNumber"], FieldKind::Text),
    field("Customer", &["customerName"], FieldKind::Text),
    field("Delivery date", &["deliveryDate"], FieldKind::Date),
    field("Status", &["status"], FieldKind::Text),
  ];
}

impl Schema for Payment {
  const COLUMNS: &'static [Column] = &[
    column("Payment", &["paymentNumber"], 12),
    column("Invoice", &["invoiceNumber"], 12),
    column("Date", &["paymentDate"], 10),
    column("Method", &["method"], 14),
    column("Amount", &["amount"], 12),
  ];
  const FIELDS: &'static [FieldSpec] = &[
    field("Payment number", &["paymentNumber"], FieldKind::Text),
    field("Invoice number", &["invoiceNumber"], FieldKind::Text),
    field("Payment date", &["paymentDate"], FieldKind::Date),
    field("Method", &["method"], FieldKind::Text),
    optional("Amount", &["amount"], FieldKind::Decimal),
  ];
}
