//! Narrow contracts for the collaborators a list view talks to.
//!
//! Clipboard, notifications, navigation and external launchers (dialler, messaging deep
//! link, mail client) are out of scope; controllers only see these traits. Every failure
//! on these seams is caught at the call site and turned into a toast, never propagated.

use crate::constants::WHATSAPP_BASE_URL;
use crate::error::{CabinetError, CabinetResult};
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ToastVariant {
    #[default]
    Default,
    Success,
    Destructive,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Toast {
    pub title: String,
    pub description: String,
    pub variant: ToastVariant,
}

impl Toast {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            variant: ToastVariant::Default,
        }
    }

    pub fn success(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            variant: ToastVariant::Success,
            ..Self::new(title, description)
        }
    }

    pub fn destructive(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            variant: ToastVariant::Destructive,
            ..Self::new(title, description)
        }
    }
}

/// Fire-and-forget user notifications.
pub trait Notifier {
    fn show(&self, toast: Toast);
}

pub trait Clipboard {
    fn write(&mut self, text: &str) -> CabinetResult<()>;
}

pub trait Navigator {
    fn go_to(&mut self, path: &str);
}

/// Hands a URI (`tel:`, `mailto:`, `https://wa.me/...`) to an external handler.
pub trait Launcher {
    fn launch(&mut self, uri: &str) -> CabinetResult<()>;
}

/// The collaborators injected into a domain controller.
pub struct Services {
    pub clipboard: Box<dyn Clipboard>,
    pub notifier: Box<dyn Notifier>,
    pub navigator: Box<dyn Navigator>,
    pub launcher: Box<dyn Launcher>,
}

impl Services {
    /// In-memory collaborators plus handles to inspect what they recorded.
    pub fn in_memory() -> (Self, Recorders) {
        let recorders = Recorders::default();
        let services = Self {
            clipboard: Box::new(recorders.clipboard.clone()),
            notifier: Box::new(recorders.toasts.clone()),
            navigator: Box::new(recorders.navigation.clone()),
            launcher: Box::new(recorders.launches.clone()),
        };
        (services, recorders)
    }

    pub fn notify(&self, toast: Toast) {
        self.notifier.show(toast);
    }

    pub fn go_to(&mut self, path: &str) {
        tracing::debug!("navigating to {}", path);
        self.navigator.go_to(path);
    }

    /// Copies `text`, reporting the outcome as a toast. Returns whether the copy worked.
    pub fn copy_text(&mut self, text: &str, what: &str) -> bool {
        if text.trim().is_empty() {
            self.notify(Toast::destructive("Rien à copier", format!("{what} est vide")));
            return false;
        }

        match self.clipboard.write(text) {
            Ok(()) => {
                self.notify(Toast::success("Copié", format!("{what} copié dans le presse-papiers")));
                true
            }
            Err(e) => {
                tracing::warn!("clipboard write failed: {}", e);
                self.notify(Toast::destructive(
                    "Copie impossible",
                    "Le presse-papiers n'est pas accessible",
                ));
                false
            }
        }
    }

    /// Opens the dialler for `phone`.
    pub fn call(&mut self, phone: &str, country_code: &str) -> bool {
        match dial_uri(phone, country_code) {
            Some(uri) => self.launch(&uri),
            None => {
                self.notify(Toast::destructive(
                    "Numéro indisponible",
                    "Aucun numéro de téléphone valide",
                ));
                false
            }
        }
    }

    /// Opens a messaging conversation with `phone`, optionally pre-filled with `text`.
    pub fn message(&mut self, phone: &str, country_code: &str, text: Option<&str>) -> bool {
        match whatsapp_uri(phone, country_code, text) {
            Some(uri) => self.launch(&uri),
            None => {
                self.notify(Toast::destructive(
                    "Numéro indisponible",
                    "Impossible d'ouvrir la messagerie sans numéro valide",
                ));
                false
            }
        }
    }

    /// Opens the mail client addressed to `email`.
    pub fn mail(&mut self, email: &str, subject: Option<&str>) -> bool {
        match mailto_uri(email, subject) {
            Some(uri) => self.launch(&uri),
            None => {
                self.notify(Toast::destructive(
                    "Email indisponible",
                    "Aucune adresse email valide",
                ));
                false
            }
        }
    }

    fn launch(&mut self, uri: &str) -> bool {
        match self.launcher.launch(uri) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("launch failed for {}: {}", uri, e);
                self.notify(Toast::destructive("Ouverture impossible", e.to_string()));
                false
            }
        }
    }
}

/// Digits of an international number, or `None` if too short to dial.
///
/// Local numbers (no `+`/`00` prefix) get `country_code` prepended.
pub fn international_digits(phone: &str, country_code: &str) -> Option<String> {
    let trimmed = phone.trim();
    let digits: String = trimmed.chars().filter(char::is_ascii_digit).collect();
    if digits.len() < 8 {
        return None;
    }

    if trimmed.starts_with('+') {
        Some(digits)
    } else if let Some(rest) = digits.strip_prefix("00") {
        Some(rest.to_string())
    } else {
        Some(format!("{country_code}{digits}"))
    }
}

pub fn dial_uri(phone: &str, country_code: &str) -> Option<String> {
    international_digits(phone, country_code).map(|d| format!("tel:+{d}"))
}

pub fn whatsapp_uri(phone: &str, country_code: &str, text: Option<&str>) -> Option<String> {
    let digits = international_digits(phone, country_code)?;
    let mut uri = format!("{WHATSAPP_BASE_URL}{digits}");
    if let Some(text) = text.filter(|t| !t.trim().is_empty()) {
        uri.push_str("?text=");
        uri.push_str(&urlencoding::encode(text));
    }
    Some(uri)
}

pub fn mailto_uri(email: &str, subject: Option<&str>) -> Option<String> {
    let email = email.trim();
    let (local, domain) = email.split_once('@')?;
    if local.is_empty() || !domain.contains('.') || email.contains(char::is_whitespace) {
        return None;
    }

    let mut uri = format!("mailto:{email}");
    if let Some(subject) = subject.filter(|s| !s.trim().is_empty()) {
        uri.push_str("?subject=");
        uri.push_str(&urlencoding::encode(subject));
    }
    Some(uri)
}

// ============================================================================
// In-memory collaborators
// ============================================================================

/// Shared handles onto the in-memory collaborators built by [`Services::in_memory`].
#[derive(Clone, Default)]
pub struct Recorders {
    pub toasts: ToastLog,
    pub clipboard: MemoryClipboard,
    pub navigation: NavigationLog,
    pub launches: LaunchLog,
}

/// Notifier that keeps every toast.
#[derive(Clone, Default)]
pub struct ToastLog(Rc<RefCell<Vec<Toast>>>);

impl ToastLog {
    pub fn toasts(&self) -> Vec<Toast> {
        self.0.borrow().clone()
    }

    pub fn last(&self) -> Option<Toast> {
        self.0.borrow().last().cloned()
    }
}

impl Notifier for ToastLog {
    fn show(&self, toast: Toast) {
        self.0.borrow_mut().push(toast);
    }
}

/// Notifier that writes toasts to the log.
#[derive(Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn show(&self, toast: Toast) {
        match toast.variant {
            ToastVariant::Destructive => tracing::warn!("{}: {}", toast.title, toast.description),
            _ => tracing::info!("{}: {}", toast.title, toast.description),
        }
    }
}

#[derive(Clone, Default)]
pub struct MemoryClipboard {
    contents: Rc<RefCell<Option<String>>>,
    unavailable: Rc<RefCell<bool>>,
}

impl MemoryClipboard {
    pub fn contents(&self) -> Option<String> {
        self.contents.borrow().clone()
    }

    /// Makes every following write fail.
    pub fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.borrow_mut() = unavailable;
    }
}

impl Clipboard for MemoryClipboard {
    fn write(&mut self, text: &str) -> CabinetResult<()> {
        if *self.unavailable.borrow() {
            return Err(CabinetError::Clipboard("permission denied".into()));
        }
        *self.contents.borrow_mut() = Some(text.to_string());
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct NavigationLog(Rc<RefCell<Vec<String>>>);

impl NavigationLog {
    pub fn paths(&self) -> Vec<String> {
        self.0.borrow().clone()
    }
}

impl Navigator for NavigationLog {
    fn go_to(&mut self, path: &str) {
        self.0.borrow_mut().push(path.to_string());
    }
}

#[derive(Clone, Default)]
pub struct LaunchLog {
    uris: Rc<RefCell<Vec<String>>>,
    unavailable: Rc<RefCell<bool>>,
}

impl LaunchLog {
    pub fn uris(&self) -> Vec<String> {
        self.uris.borrow().clone()
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.borrow_mut() = unavailable;
    }
}

impl Launcher for LaunchLog {
    fn launch(&mut self, uri: &str) -> CabinetResult<()> {
        if *self.unavailable.borrow() {
            return Err(CabinetError::Launch(format!("no handler for {uri}")));
        }
        self.uris.borrow_mut().push(uri.to_string());
        Ok(())
    }
}
