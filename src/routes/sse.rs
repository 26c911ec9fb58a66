use crate::state::FeebookState;
use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::Stream;
use std::convert::Infallible;
use tokio_stream::{StreamExt, wrappers::BroadcastStream};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SseEvent {
    CrudStudent,
    CrudPayment,
}

impl SseEvent {
    pub const fn name(self) -> &'static str {
        match self {
            Self::CrudStudent => "crud_student",
            Self::CrudPayment => "crud_payment",
        }
    }
}

pub async fn sse_feed(
    State(state): State<FeebookState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = BroadcastStream::new(state.subscribe_to_sse_feed()).filter_map(|event| match event {
        Ok(event) => Some(Ok(Event::default().event(event.name()).data(event.name()))),
        Err(e) => {
            warn!(?e, "SSE subscriber fell behind");
            None
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
