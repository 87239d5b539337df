//! bubblemark-sheet - Printable bubble sheets
//!
//! - [`layout`]: page geometry in millimetres
//! - [`generator`]: roster pagination, page drawings and bubble templates
//! - [`codec`]: 12-digit page identifiers and the lecture hash registry
//! - [`store`]: template persistence
//!
//! # Examples
//!
//! ```
//! use bubblemark_sheet::{
//!     IdentifierCodec, InMemoryTemplateStore, LectureIdentifier, SheetGenerator, SheetLayout,
//!     Student, TemplateStore,
//! };
//!
//! let generator = SheetGenerator::new(SheetLayout::default(), IdentifierCodec::default()).unwrap();
//! let students = vec![Student::new("S1", "Ada"), Student::new("S2", "Grace")];
//! let doc = generator.generate(&LectureIdentifier::new("LEC-1"), &students).unwrap();
//!
//! let store = InMemoryTemplateStore::new();
//! doc.save_templates(&store).unwrap();
//! assert_eq!(store.get_templates("LEC-1", 1).unwrap().len(), 2);
//! ```

pub mod codec;
mod error;
pub mod generator;
pub mod layout;
pub mod store;
pub mod template;

pub use codec::{
    DecodedIdentifier, IdentifierCodec, LectureIdentifier, LectureRegistry, PAYLOAD_DIGITS,
    lecture_hash,
};
pub use error::{SheetError, SheetResult};
pub use generator::{SheetDocument, SheetGenerator, SheetPage};
pub use layout::SheetLayout;
pub use store::{InMemoryTemplateStore, JsonDirTemplateStore, TemplateStore};
pub use template::{BubbleTemplate, Student};
