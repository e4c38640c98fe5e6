pub mod classification;
pub mod modification;
pub mod responses;

pub use classification::{classification_prompt, classification_system_prompt};
pub use modification::{modification_batch_prompt, modification_system_prompt};
pub use responses::FormatResponse;
