/// Command-line substrings bound to pill names.
///
/// Triggers are tried in insertion order (the order they are declared in the
/// configuration file) and the first substring contained in a command line wins.
/// With `{"game": "casual", "game.exe": "game"}` a command line containing
/// `game.exe` therefore selects `casual`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TriggerMap {
    triggers: Vec<(String, String)>,
}

impl TriggerMap {
    pub fn new<I, S, P>(triggers: I) -> Self
    where
        I: IntoIterator<Item = (S, P)>,
        S: Into<String>,
        P: Into<String>,
    {
        let mut map = Self::default();
        for (substring, pill) in triggers {
            map.insert(substring, pill);
        }
        map
    }

    /// Binds `substring` to `pill`. Rebinding keeps the original position.
    pub fn insert(&mut self, substring: impl Into<String>, pill: impl Into<String>) {
        let substring = substring.into();
        let pill = pill.into();
        match self.triggers.iter_mut().find(|(s, _)| *s == substring) {
            Some(entry) => entry.1 = pill,
            None => self.triggers.push((substring, pill)),
        }
    }

    /// Returns the pill bound to the first trigger contained in `cmdline`.
    pub fn find(&self, cmdline: &str) -> Option<&str> {
        self.triggers
            .iter()
            .find(|(substring, _)| cmdline.contains(substring.as_str()))
            .map(|(_, pill)| pill.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.triggers.iter().map(|(s, p)| (s.as_str(), p.as_str()))
    }

    pub fn len(&self) -> usize {
        self.triggers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triggers.is_empty()
    }
}
