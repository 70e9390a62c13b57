use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub(crate) enum NavigationError {
    #[error("unknown page '{name}'; known pages: {known}")]
    UnknownPage { name: String, known: String },
    #[error("navigator needs at least one page")]
    NoPages,
}

/// Tracks which page is showing. Exactly one page is active at a time.
#[derive(Debug, Clone)]
pub(crate) struct PageNavigator {
    pages: Vec<String>,
    active: usize,
}

impl PageNavigator {
    /// Starts on the first page.
    pub(crate) fn new(pages: Vec<String>) -> Result<Self, NavigationError> {
        if pages.is_empty() {
            return Err(NavigationError::NoPages);
        }
        Ok(Self { pages, active: 0 })
    }

    pub(crate) fn active(&self) -> &str {
        &self.pages[self.active]
    }

    pub(crate) fn is_active(&self, name: &str) -> bool {
        self.active() == name
    }

    pub(crate) fn pages(&self) -> &[String] {
        &self.pages
    }

    /// Returns whether the active page changed. An unknown name leaves the
    /// current page active.
    pub(crate) fn switch_to(&mut self, name: &str) -> Result<bool, NavigationError> {
        let Some(index) = self.pages.iter().position(|page| page == name) else {
            warn!(page = name, "page_switch_rejected");
            return Err(NavigationError::UnknownPage {
                name: name.to_string(),
                known: self.pages.join(", "),
            });
        };
        if index == self.active {
            return Ok(false);
        }
        self.active = index;
        info!(page = self.active(), "page_switched");
        Ok(true)
    }

    /// Activates the following page, wrapping around. Returns whether the
    /// active page changed, which it never does with a single page.
    pub(crate) fn cycle_next(&mut self) -> bool {
        let next = (self.active + 1) % self.pages.len();
        if next == self.active {
            return false;
        }
        self.active = next;
        info!(page = self.active(), "page_switched");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn navigator() -> PageNavigator {
        PageNavigator::new(vec!["home".into(), "quiz".into(), "chat".into()]).expect("pages")
    }

    #[test]
    fn starts_on_first_page() {
        let nav = navigator();
        assert_eq!(nav.active(), "home");
        assert!(nav.is_active("home"));
        assert!(!nav.is_active("chat"));
    }

    #[test]
    fn switch_to_activates_only_named_page() {
        let mut nav = navigator();
        assert_eq!(nav.switch_to("chat"), Ok(true));
        assert_eq!(nav.active(), "chat");
        assert_eq!(
            nav.pages().iter().filter(|page| nav.is_active(page)).count(),
            1
        );
        assert_eq!(nav.switch_to("chat"), Ok(false));
    }

    #[test]
    fn unknown_page_is_rejected_without_change() {
        let mut nav = navigator();
        nav.switch_to("quiz").expect("quiz");
        let err = nav.switch_to("settings").expect_err("unknown");
        assert!(matches!(err, NavigationError::UnknownPage { ref name, .. } if name == "settings"));
        assert_eq!(nav.active(), "quiz");
    }

    #[test]
    fn cycle_wraps_around() {
        let mut nav = navigator();
        assert!(nav.cycle_next());
        assert_eq!(nav.active(), "quiz");
        assert!(nav.cycle_next());
        assert_eq!(nav.active(), "chat");
        assert!(nav.cycle_next());
        assert_eq!(nav.active(), "home");
    }

    #[test]
    fn cycling_a_single_page_reports_no_change() {
        let mut nav = PageNavigator::new(vec!["home".into()]).expect("pages");
        assert!(!nav.cycle_next());
        assert_eq!(nav.active(), "home");
    }

    #[test]
    fn empty_page_list_is_an_error() {
        assert_eq!(
            PageNavigator::new(Vec::new()).expect_err("empty"),
            NavigationError::NoPages
        );
    }
}
