//! Domain logic for the live voice task assistant: the task draft the model
//! fills in, the phonetic glossary fed into its instructions, and the sink
//! that receives finished drafts.

pub mod glossary;
pub mod instruction;
pub mod sink;
pub mod task_draft;
