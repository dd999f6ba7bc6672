use std::collections::VecDeque;
use std::sync::Arc;

use core_types::{Notifier, Toast, ToastVariant};
use i18n::I18n;
use parking_lot::Mutex;

/// Resolves catalogue keys and forwards toasts to the notifier.
#[derive(Clone)]
pub struct Toaster {
    notifier: Arc<dyn Notifier>,
    i18n: Arc<I18n>,
}

impl Toaster {
    pub fn new(notifier: Arc<dyn Notifier>, i18n: Arc<I18n>) -> Self {
        Self { notifier, i18n }
    }

    pub fn t(&self, key: &str) -> String {
        self.i18n.t(key).to_owned()
    }

    pub fn format(&self, key: &str, args: &[(&str, &str)]) -> String {
        self.i18n.format(key, args)
    }

    /// Title and description are both catalogue keys.
    pub fn show(&self, variant: ToastVariant, title_key: &str, description_key: &str) {
        self.emit(variant, title_key, self.t(description_key));
    }

    /// Title is a catalogue key, description is already user-facing text.
    pub fn emit(&self, variant: ToastVariant, title_key: &str, description: impl Into<String>) {
        self.notifier.notify(Toast {
            variant,
            title: self.t(title_key),
            description: description.into(),
        });
    }

    /// "Success" toast with a catalogue description.
    pub fn success(&self, description_key: &str) {
        self.show(ToastVariant::Default, "toast.success", description_key);
    }

    /// Destructive "Error" toast with a catalogue description.
    pub fn failure(&self, description_key: &str) {
        self.show(ToastVariant::Destructive, "toast.error", description_key);
    }
}

/// Notifier that keeps the most recent toasts for the UI to drain.
#[derive(Debug, Default)]
pub struct ToastLog {
    entries: Mutex<VecDeque<Toast>>,
    capacity: Option<usize>,
}

impl ToastLog {
    pub fn bounded(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
            capacity: Some(capacity.max(1)),
        }
    }

    pub fn snapshot(&self) -> Vec<Toast> {
        self.entries.lock().iter().cloned().collect()
    }

    pub fn drain(&self) -> Vec<Toast> {
        self.entries.lock().drain(..).collect()
    }

    pub fn titles(&self) -> Vec<String> {
        self.entries
            .lock()
            .iter()
            .map(|toast| toast.title.clone())
            .collect()
    }

    pub fn last(&self) -> Option<Toast> {
        self.entries.lock().back().cloned()
    }
}

impl Notifier for ToastLog {
    fn notify(&self, toast: Toast) {
        let mut entries = self.entries.lock();
        entries.push_back(toast);
        if let Some(capacity) = self.capacity {
            while entries.len() > capacity {
                entries.pop_front();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_keys_into_toasts() {
        let log = Arc::new(ToastLog::default());
        let toaster = Toaster::new(log.clone(), Arc::new(I18n::default()));

        toaster.success("kb.created");
        toaster.emit(ToastVariant::Destructive, "items.processing_failed", "network down");

        let toasts = log.snapshot();
        assert_eq!(
            toasts[0],
            Toast::info("Success", "Knowledge base created successfully")
        );
        assert_eq!(toasts[1], Toast::error("Processing failed", "network down"));
    }

    #[test]
    fn bounded_log_drops_oldest() {
        let log = ToastLog::bounded(2);
        for title in ["a", "b", "c"] {
            log.notify(Toast::info(title, ""));
        }
        assert_eq!(log.titles(), vec!["b", "c"]);
        assert_eq!(log.drain().len(), 2);
        assert!(log.last().is_none());
    }
}
