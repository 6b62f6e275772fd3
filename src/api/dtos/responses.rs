use serde::Serialize;

#[derive(Serialize)]
pub struct ReconcileResponse {
    pub replayed: usize,
}

#[derive(Serialize)]
pub struct DeletedResponse {
    pub id: String,
    pub status: &'static str,
}
