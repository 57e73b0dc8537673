mod command_input;
mod confirm_dialog;
mod form_dialog;
mod input;
mod key_result;
mod search_input;

pub use command_input::{CommandEvent, CommandInput};
pub use confirm_dialog::{ConfirmDialog, ConfirmEvent};
pub use form_dialog::{FormDialog, FormEvent, FormPayload};
pub use key_result::KeyResult;
pub use search_input::{SearchEvent, SearchInput};
