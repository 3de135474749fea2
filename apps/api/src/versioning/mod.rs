// Versioning: per-(job, doc_type) version history, similarity retrieval over
// prior versions, and the submit / load / rollback workflow.

pub mod handlers;
pub mod manager;
pub mod retrieval;
