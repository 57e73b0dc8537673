mod record_detail;
mod resource_list;

pub use record_detail::RecordDetailView;
pub use resource_list::ResourceListView;

use crate::api::resources::{CustomerGroup, DeliveryNote, Invoice, Lead, Payment, SalesOrder};
use crate::api::{Hooks, PageRequest, ResourceKind};
use crate::ui::view::View;

/// Root list view for a resource kind
pub fn resource_list(kind: ResourceKind, hooks: Hooks, request: PageRequest) -> Box<dyn View> {
  match kind {
    ResourceKind::Lead => Box::new(ResourceListView::<Lead>::new(hooks, request)),
    ResourceKind::CustomerGroup => Box::new(ResourceListView::<CustomerGroup>::new(hooks, request)),
    ResourceKind::SalesOrder => Box::new(ResourceListView::<SalesOrder>::new(hooks, request)),
    ResourceKind::Invoice => Box::new(ResourceListView::<Invoice>::new(hooks, request)),
    ResourceKind::DeliveryNote => Box::new(ResourceListView::<DeliveryNote>::new(hooks, request)),
    ResourceKind::Payment => Box::new(ResourceListView::<Payment>::new(hooks, request)),
  }
}
