mod analysis;
mod common;

pub use analysis::{content_judgment_prompt, JUDGMENT_CONTENT_LIMIT};
pub use common::JSON_ONLY;
