use crate::{
    config::RuntimeConfiguration,
    data::collection::StudentCollection,
    error::FeebookResult,
    maud_conveniences::render_nav,
    routes::{Page, sse::SseEvent},
    storage::Repository,
};
use jiff::Zoned;
use maud::{DOCTYPE, Markup, html};
use std::sync::Arc;
use tokio::sync::{
    Mutex,
    broadcast::{Receiver, Sender, channel},
};

/// Without this htmx drops 4xx/5xx bodies instead of swapping in the rendered error.
const HTMX_CONFIG: &str = r#"{"responseHandling":[{"code":"204","swap":false},{"code":"[2345]..","swap":true}]}"#;

#[derive(Clone, Debug)]
pub struct FeebookState {
    repository: Repository,
    config: RuntimeConfiguration,
    write_lock: Arc<Mutex<()>>,
    sse_events_sender: Sender<SseEvent>,
}

impl FeebookState {
    pub fn new(repository: Repository, config: RuntimeConfiguration) -> Self {
        let (tx, _rx) = channel(16);

        Self {
            repository,
            config,
            write_lock: Arc::new(Mutex::new(())),
            sse_events_sender: tx,
        }
    }

    #[allow(clippy::needless_pass_by_value)]
    pub fn render(&self, page: Page, markup: Markup) -> Markup {
        let nav = render_nav(&page);

        html! {
            (DOCTYPE)
            html {
                head {
                    meta charset="UTF-8" {}
                    meta name="viewport" content="width=device-width, initial-scale=1.0" {}
                    meta name="htmx-config" content=(HTMX_CONFIG) {}
                    script src="https://unpkg.com/htmx.org@2.0.4" integrity="sha384-HGfztofotfshcF7+8n44JQL2oJmowVChPTg48S+jvZoztPfvwD79OC/LTtG6dMp+" crossorigin="anonymous" {}
                    script src="https://unpkg.com/htmx-ext-sse@2.2.3" integrity="sha384-Y4gc0CK6Kg+hmulDc6rZPJu0tqvk7EWlih0Oh+2OkAi1ZDlCbBDCQEE2uVk472Ky" crossorigin="anonymous" {}
                    script src="https://cdn.jsdelivr.net/npm/@tailwindcss/browser@4" {}
                    title { "Feebook - " (page.title()) }
                }
                body hx-ext="sse" sse-connect="/sse_feed" class="bg-gray-900 min-h-screen flex flex-col items-center text-white" {
                    (nav)
                    main class="w-full max-w-6xl px-4" {
                        (markup)
                    }
                }
            }
        }
    }

    pub const fn config(&self) -> &RuntimeConfiguration {
        &self.config
    }

    pub const fn repository(&self) -> &Repository {
        &self.repository
    }

    pub fn now(&self) -> Zoned {
        self.config.date_locale_config().now()
    }

    pub async fn students(&self) -> FeebookResult<StudentCollection> {
        self.repository.load().await
    }

    /// Runs one load, change, save cycle while holding the write lock. Nothing is saved if `f`
    /// fails.
    pub async fn mutate<T>(
        &self,
        f: impl FnOnce(&mut StudentCollection) -> FeebookResult<T>,
    ) -> FeebookResult<T> {
        let _guard = self.write_lock.lock().await;

        let mut collection = self.repository.load().await?;
        let output = f(&mut collection)?;
        self.repository.save(&collection).await?;
        Ok(output)
    }

    pub fn subscribe_to_sse_feed(&self) -> Receiver<SseEvent> {
        self.sse_events_sender.subscribe()
    }

    pub fn send_sse_event(&self, event: SseEvent) {
        let _ = self.sse_events_sender.send(event);
    }
}

#[cfg(test)]
impl FeebookState {
    pub fn test_state() -> Self {
        Self::new(
            Repository::new(crate::storage::MemoryBlobStore::default()),
            RuntimeConfiguration::test_config(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::student::test_details;

    #[tokio::test]
    async fn failed_mutation_is_not_saved() {
        let state = FeebookState::test_state();
        let now = state.now().timestamp();
        state
            .mutate(|students| students.add_student(test_details("Asha", "asha@example.org"), now))
            .await
            .unwrap();

        let result = state
            .mutate(|students| students.add_student(test_details("Asha", "asha@example.org"), now))
            .await;
        assert!(result.is_err());
        assert_eq!(state.students().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn concurrent_payments_are_both_kept() {
        let state = FeebookState::test_state();
        let now = state.now().timestamp();
        let id = state
            .mutate(|students| students.add_student(test_details("Asha", "asha@example.org"), now))
            .await
            .unwrap();

        let pay = |amount: f64| {
            let state = state.clone();
            async move {
                state
                    .mutate(|students| students.record_payment(id, amount, now))
                    .await
            }
        };
        let (a, b) = tokio::join!(
            tokio::spawn(pay(100.0)),
            tokio::spawn(pay(200.0))
        );
        a.unwrap().unwrap();
        b.unwrap().unwrap();

        let students = state.students().await.unwrap();
        let student = students.get(id).unwrap();
        assert_eq!(student.fee_history().len(), 2);
        approx::assert_relative_eq!(student.paid_fees(), 300.0);
    }
}
