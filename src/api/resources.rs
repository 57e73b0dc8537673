//! Domain record types, one per backend collection.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::types::{Resource, ResourceKind};

// ============================================================================
// Leads
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
  #[serde(default)]
  pub phone: String,
  #[serde(default)]
  pub email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
  pub lead_name: String,
  pub lead_source: String,
  #[serde(default)]
  pub contact_info: ContactInfo,
  pub lead_status: String,
  pub lead_owner: String,
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub territory: String,
  #[serde(default)]
  pub lead_rating: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadPatch {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub lead_name: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub lead_source: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub contact_info: Option<ContactInfo>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub lead_status: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub lead_owner: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub territory: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub lead_rating: Option<u8>,
}

impl Resource for Lead {
  type Patch = LeadPatch;
  const KIND: ResourceKind = ResourceKind::Lead;

  fn title(&self) -> String {
    self.lead_name.clone()
  }
}

// ============================================================================
// Customer groups
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerGroup {
  pub name: String,
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub description: String,
  #[serde(default)]
  pub discount_percent: f64,
  #[serde(default = "default_true")]
  pub active: bool,
}

fn default_true() -> bool {
  true
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerGroupPatch {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub discount_percent: Option<f64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub active: Option<bool>,
}

impl Resource for CustomerGroup {
  type Patch = CustomerGroupPatch;
  const KIND: ResourceKind = ResourceKind::CustomerGroup;

  fn title(&self) -> String {
    self.name.clone()
  }
}

// ============================================================================
// Sales orders
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesOrder {
  pub order_number: String,
  pub customer_name: String,
  pub order_date: NaiveDate,
  pub status: String,
  #[serde(default)]
  pub total_amount: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesOrderPatch {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub order_number: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub customer_name: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub order_date: Option<NaiveDate>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub status: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub total_amount: Option<f64>,
}

impl Resource for SalesOrder {
  type Patch = SalesOrderPatch;
  const KIND: ResourceKind = ResourceKind::SalesOrder;

  fn title(&self) -> String {
    self.order_number.clone()
  }
}

// ============================================================================
// Invoices
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
  pub invoice_number: String,
  pub customer_name: String,
  pub issue_date: NaiveDate,
  pub due_date: NaiveDate,
  pub status: String,
  #[serde(default)]
  pub amount: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoicePatch {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub invoice_number: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub customer_name: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub issue_date: Option<NaiveDate>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub due_date: Option<NaiveDate>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub status: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub amount: Option<f64>,
}

impl Resource for Invoice {
  type Patch = InvoicePatch;
  const KIND: ResourceKind = ResourceKind::Invoice;

  fn title(&self) -> String {
    self.invoice_number.clone()
  }
}

// ============================================================================
// Delivery notes
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryNote {
  pub delivery_number: String,
  pub order_number: String,
  pub customer_name: String,
  pub delivery_date: NaiveDate,
  pub status: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryNotePatch {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub delivery_number: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub order_number: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub customer_name: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub delivery_date: Option<NaiveDate>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub status: Option<String>,
}

impl Resource for DeliveryNote {
  type Patch = DeliveryNotePatch;
  const KIND: ResourceKind = ResourceKind::DeliveryNote;

  fn title(&self) -> String {
    self.delivery_number.clone()
  }
}

// ============================================================================
// Payments
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
  pub payment_number: String,
  pub invoice_number: String,
  pub payment_date: NaiveDate,
  pub method: String,
  #[serde(default)]
  pub amount: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentPatch {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub payment_number: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub invoice_number: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub payment_date: Option<NaiveDate>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub method: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub amount: Option<f64>,
}

impl Resource for Payment {
  type Patch = PaymentPatch;
  const KIND: ResourceKind = ResourceKind::Payment;

  fn title(&self) -> String {
    self.payment_number.clone()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::types::Record;

  #[test]
  fn test_lead_record_deserializes_flattened_fields() {
    let json = r#"{
      "id": 42,
      "leadName": "Acme",
      "leadSource": "Web",
      "contactInfo": {"phone": "555-0100", "email": "a@acme.com"},
      "leadStatus": "New",
      "leadOwner": "Jane",
      "territory": "West",
      "leadRating": 3,
      "createdAt": "2024-03-01T10:00:00Z",
      "updatedAt": "2024-03-02T10:00:00Z"
    }"#;

    let record: Record<Lead> = serde_json::from_str(json).unwrap();
    assert_eq!(record.id, 42);
    assert_eq!(record.fields.lead_name, "Acme");
    assert_eq!(record.fields.contact_info.email, "a@acme.com");
    assert!(record.created_at.is_some());
    assert!(record.updated_at.is_some());
  }

  #[test]
  fn test_patch_sends_only_set_fields() {
    let patch = LeadPatch {
      lead_status: Some("Qualified".to_string()),
      ..Default::default()
    };
    let value = serde_json::to_value(&patch).unwrap();
    assert_eq!(value, serde_json::json!({"leadStatus": "Qualified"}));
  }

  #[test]
  fn test_order_date_uses_iso_format() {
    let order = SalesOrder {
      order_number: "SO-1".to_string(),
      customer_name: "Acme".to_string(),
      order_date: NaiveDate::from_ymd_opt(2024, 5, 17).unwrap(),
      status: "Open".to_string(),
      total_amount: 120.5,
    };
    let value = serde_json::to_value(&order).unwrap();
    assert_eq!(value["orderDate"], "2024-05-17");
    assert_eq!(value["totalAmount"], 120.5);
  }
}
