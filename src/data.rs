use serde::Deserialize;
use uuid::Uuid;

pub mod collection;
pub mod payment;
pub mod student;

#[derive(Deserialize)]
pub struct IdForm {
    pub id: Uuid,
}
