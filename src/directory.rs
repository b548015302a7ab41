use std::collections::HashMap;
use std::path::Path;

/// The set of local users and their plaintext passwords.
#[derive(Debug, Clone, Default)]
pub struct UserDirectory {
    users: HashMap<String, String>,
}

impl UserDirectory {
    pub fn from_pairs<I, N, P>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (N, P)>,
        N: Into<String>,
        P: Into<String>,
    {
        Self {
            users: pairs
                .into_iter()
                .map(|(name, password)| (name.into(), password.into()))
                .collect(),
        }
    }

    /// Parse `name password` lines. Blank lines and `#` comments are skipped.
    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let mut users = HashMap::new();

        for (number, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let mut fields = line.split_whitespace();
            match (fields.next(), fields.next(), fields.next()) {
                (Some(name), Some(password), None) => {
                    users.insert(name.to_string(), password.to_string());
                }
                _ => anyhow::bail!("Malformed user entry on line {}", number + 1),
            }
        }

        Ok(Self { users })
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Load the users file, or fall back to an empty directory if it is absent.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::warn!("Users file {} not found, no users are registered", path.display());
            return Ok(Self::default());
        }

        let directory = Self::from_file(path)?;
        tracing::info!("Loaded {} users from {}", directory.len(), path.display());
        Ok(directory)
    }

    /// With a password, checks the pair authenticates; without, checks the
    /// user exists.
    pub fn is_valid_user(&self, name: &str, password: Option<&str>) -> bool {
        match (self.users.get(name), password) {
            (Some(expected), Some(given)) => expected == given,
            (Some(_), None) => true,
            (None, _) => false,
        }
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}
