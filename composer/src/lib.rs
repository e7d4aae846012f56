pub mod catalog;
pub mod derive;
pub mod error;
pub mod html;
pub mod render;
pub mod resolve;

pub use catalog::Composer;
pub use derive::{apply_edit, derive_layout};
pub use error::{ComposeError, EditError, LayoutValidationError, TemplateConstraintError};
pub use html::to_html;
pub use render::{FieldWidget, FormNode, FormSection, FormTree, UnplacedError, render_form};
pub use resolve::{resolve_layout, validate_layout};
