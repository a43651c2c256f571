//! Persistent storage using RocksDB.
//!
//! Key layout (values are JSON unless noted):
//!
//! ```text
//! profile:{id}                    Profile
//! username:{lowercase}            profile id (raw)
//! theme:{id}                      Theme
//! poem:{id}                       Poem
//! tpoem:{theme_id}:{poem_id}      empty (theme → poems index)
//! like:{poem_id}:{hex(user)}      PoemLike
//! edge:{id}                       Edge
//! pair:{hex(lo)}:{hex(hi)}        edge id (raw)
//! uedge:{hex(user)}:{edge_id}     empty (user → edges index)
//! ```
//!
//! User ids are opaque, so they are hex-encoded wherever they form part of
//! a composite key.

use crate::error::{Error, Result};
use crate::models::{Poem, PoemLike, Profile, ProfileUpdate, Theme};
use rocksdb::{Options, WriteBatch, DB};
use rumble_ranking::ContributionRecord;
use rumble_social::{now_millis, Edge, EdgeStore, PairKey, StoreError};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::path::Path;

/// Storage backend for node data.
pub struct Storage {
    db: DB,
}

impl Storage {
    /// Open or create storage at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        let db = DB::open(&opts, path)?;
        Ok(Self { db })
    }

    fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.db.get(key.as_bytes())? {
            Some(data) => Ok(Some(serde_json::from_slice(&data)?)),
            None => Ok(None),
        }
    }

    /// Keys and values under `prefix`, in key order.
    fn scan_prefix(&self, prefix: &str) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let prefix = prefix.as_bytes();
        let mut items = Vec::new();

        for item in self.db.prefix_iterator(prefix) {
            let (key, value) = item?;
            if key.starts_with(prefix) {
                items.push((key.to_vec(), value.to_vec()));
            } else {
                break;
            }
        }

        Ok(items)
    }

    fn list_json<T: DeserializeOwned>(&self, prefix: &str) -> Result<Vec<T>> {
        self.scan_prefix(prefix)?
            .into_iter()
            .map(|(_, value)| serde_json::from_slice(&value).map_err(Error::from))
            .collect()
    }

    // --- Profiles ---

    /// Store a new profile. Fails if the id exists or the username is taken.
    pub fn create_profile(&self, profile: &Profile) -> Result<()> {
        if self.get_profile(&profile.id)?.is_some() {
            return Err(Error::InvalidInput(format!("profile {} already exists", profile.id)));
        }
        let username_key = Self::username_index(&profile.username)?;
        if self.db.get(username_key.as_bytes())?.is_some() {
            return Err(Error::InvalidInput("Username is already taken".into()));
        }

        let mut batch = WriteBatch::default();
        batch.put(format!("profile:{}", profile.id), serde_json::to_vec(profile)?);
        batch.put(username_key, profile.id.as_bytes());
        self.db.write(batch)?;
        Ok(())
    }

    /// Get a profile by id.
    pub fn get_profile(&self, id: &str) -> Result<Option<Profile>> {
        self.get_json(&format!("profile:{}", id))
    }

    /// Profile id owning a username, if any.
    pub fn profile_id_for_username(&self, username: &str) -> Result<Option<String>> {
        let key = Self::username_index(username)?;
        Ok(self
            .db
            .get(key.as_bytes())?
            .map(|id| String::from_utf8_lossy(&id).into_owned()))
    }

    /// Apply an update to an existing profile, keeping usernames unique.
    pub fn update_profile(&self, id: &str, update: ProfileUpdate) -> Result<Profile> {
        let mut profile = self
            .get_profile(id)?
            .ok_or_else(|| Error::NotFound(format!("profile {}", id)))?;

        let mut batch = WriteBatch::default();
        if let Some(ref username) = update.username {
            let new_key = Self::username_index(username)?;
            let old_key = Self::username_index(&profile.username)?;
            if new_key != old_key {
                if self.db.get(new_key.as_bytes())?.is_some() {
                    return Err(Error::InvalidInput("Username is already taken".into()));
                }
                batch.delete(old_key);
                batch.put(new_key, id.as_bytes());
            }
        }

        update.apply(&mut profile, now_millis());
        batch.put(format!("profile:{}", id), serde_json::to_vec(&profile)?);
        self.db.write(batch)?;
        Ok(profile)
    }

    /// List all profiles.
    pub fn list_profiles(&self) -> Result<Vec<Profile>> {
        self.list_json("profile:")
    }

    fn username_index(username: &str) -> Result<String> {
        let key = Profile::username_key(username);
        if key.is_empty() {
            return Err(Error::InvalidInput("username must not be empty".into()));
        }
        Ok(format!("username:{}", key))
    }

    // --- Themes ---

    /// Store a theme.
    pub fn put_theme(&self, theme: &Theme) -> Result<()> {
        let key = format!("theme:{}", theme.id);
        self.db.put(key.as_bytes(), serde_json::to_vec(theme)?)?;
        Ok(())
    }

    /// Get a theme by id.
    pub fn get_theme(&self, id: &str) -> Result<Option<Theme>> {
        self.get_json(&format!("theme:{}", id))
    }

    /// List all themes, newest first.
    pub fn list_themes(&self) -> Result<Vec<Theme>> {
        let mut themes: Vec<Theme> = self.list_json("theme:")?;
        themes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(themes)
    }

    /// Close a theme and record its winning poem.
    ///
    /// The winner has the most likes; ties go to the earlier poem, then the
    /// lower id. A theme without poems closes with no winner.
    pub fn close_theme(&self, id: &str) -> Result<Theme> {
        let mut theme = self
            .get_theme(id)?
            .ok_or_else(|| Error::NotFound(format!("theme {}", id)))?;
        if !theme.is_active {
            return Err(Error::InvalidInput(format!("theme {} is already closed", id)));
        }

        let winner = self
            .poems_for_theme(id)?
            .into_iter()
            .fold(None::<Poem>, |best, poem| match best {
                Some(best) if !poem.beats(&best) => Some(best),
                _ => Some(poem),
            });

        let now = now_millis();
        theme.is_active = false;
        theme.winner_poem_id = winner.map(|p| p.id);
        theme.closed_at = Some(now);
        theme.updated_at = now.max(theme.updated_at);
        self.put_theme(&theme)?;

        tracing::info!(theme = %theme.id, winner = ?theme.winner_poem_id, "theme closed");
        Ok(theme)
    }

    // --- Poems ---

    /// Store a poem and index it under its theme.
    pub fn put_poem(&self, poem: &Poem) -> Result<()> {
        let mut batch = WriteBatch::default();
        batch.put(format!("poem:{}", poem.id), serde_json::to_vec(poem)?);
        batch.put(format!("tpoem:{}:{}", poem.theme_id, poem.id), b"");
        self.db.write(batch)?;
        Ok(())
    }

    /// Get a poem by id.
    pub fn get_poem(&self, id: &str) -> Result<Option<Poem>> {
        self.get_json(&format!("poem:{}", id))
    }

    /// List all poems.
    pub fn list_poems(&self) -> Result<Vec<Poem>> {
        self.list_json("poem:")
    }

    /// Poems submitted to a theme, newest first.
    pub fn poems_for_theme(&self, theme_id: &str) -> Result<Vec<Poem>> {
        let prefix = format!("tpoem:{}:", theme_id);
        let mut poems = Vec::new();
        for (key, _) in self.scan_prefix(&prefix)? {
            let key = String::from_utf8_lossy(&key);
            if let Some(poem_id) = key.strip_prefix(&prefix) {
                if let Some(poem) = self.get_poem(poem_id)? {
                    poems.push(poem);
                }
            }
        }
        poems.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(poems)
    }

    /// Number of poems in a theme.
    pub fn poem_count(&self, theme_id: &str) -> Result<usize> {
        Ok(self.scan_prefix(&format!("tpoem:{}:", theme_id))?.len())
    }

    // --- Likes ---

    fn like_key(poem_id: &str, user_id: &str) -> String {
        format!("like:{}:{}", poem_id, hex::encode(user_id))
    }

    /// Whether `user_id` has liked `poem_id`.
    pub fn has_liked(&self, poem_id: &str, user_id: &str) -> Result<bool> {
        Ok(self.db.get(Self::like_key(poem_id, user_id).as_bytes())?.is_some())
    }

    /// Like or unlike a poem. Returns the updated poem and whether it is now liked.
    pub fn toggle_like(&self, poem_id: &str, user_id: &str) -> Result<(Poem, bool)> {
        let mut poem = self
            .get_poem(poem_id)?
            .ok_or_else(|| Error::NotFound(format!("poem {}", poem_id)))?;

        let key = Self::like_key(poem_id, user_id);
        let liked = self.db.get(key.as_bytes())?.is_some();

        let mut batch = WriteBatch::default();
        if liked {
            batch.delete(key);
            poem.likes_count = (poem.likes_count - 1).max(0);
        } else {
            let like = PoemLike {
                poem_id: poem_id.to_string(),
                user_id: user_id.to_string(),
                created_at: now_millis(),
            };
            batch.put(key, serde_json::to_vec(&like)?);
            poem.likes_count += 1;
        }
        poem.updated_at = now_millis().max(poem.updated_at);
        batch.put(format!("poem:{}", poem.id), serde_json::to_vec(&poem)?);
        self.db.write(batch)?;

        Ok((poem, !liked))
    }

    // --- Leaderboard input ---

    /// Aggregate contribution counts for every known poet.
    ///
    /// With `since`, only poems created and battles closed at or after that
    /// time count.
    pub fn contributions(&self, since: Option<u64>) -> Result<Vec<ContributionRecord>> {
        let in_window = |t: u64| since.map_or(true, |s| t >= s);

        let mut records: BTreeMap<String, ContributionRecord> = self
            .list_profiles()?
            .into_iter()
            .map(|p| (p.id.clone(), ContributionRecord::empty(p.id)))
            .collect();

        let poems = self.list_poems()?;
        for poem in poems.iter().filter(|p| in_window(p.created_at)) {
            let record = records
                .entry(poem.author_id.clone())
                .or_insert_with(|| ContributionRecord::empty(poem.author_id.clone()));
            record.poems_written += 1;
            record.likes_received += poem.likes_count;
        }

        let authors: BTreeMap<&str, &str> = poems
            .iter()
            .map(|p| (p.id.as_str(), p.author_id.as_str()))
            .collect();
        for theme in self.list_themes()? {
            let closed_in_window = theme.closed_at.map_or(false, in_window);
            let winner = theme
                .winner_poem_id
                .as_deref()
                .and_then(|id| authors.get(id).copied());
            if let (true, Some(author)) = (closed_in_window, winner) {
                let record = records
                    .entry(author.to_string())
                    .or_insert_with(|| ContributionRecord::empty(author));
                record.battles_won += 1;
            }
        }

        Ok(records.into_values().collect())
    }

    // --- Friendship edges ---

    fn pair_key(pair: &PairKey) -> String {
        format!("pair:{}:{}", hex::encode(pair.lo()), hex::encode(pair.hi()))
    }

    fn user_edge_key(user: &str, edge_id: &str) -> String {
        format!("uedge:{}:{}", hex::encode(user), edge_id)
    }

    fn edge_batch(&self, edge: &Edge) -> Result<WriteBatch> {
        let mut batch = WriteBatch::default();
        batch.put(format!("edge:{}", edge.id), serde_json::to_vec(edge)?);
        batch.put(Self::pair_key(&edge.pair()), edge.id.as_bytes());
        batch.put(Self::user_edge_key(&edge.user_a, &edge.id), b"");
        batch.put(Self::user_edge_key(&edge.user_b, &edge.id), b"");
        Ok(batch)
    }

    fn try_get_edge(&self, id: &str) -> Result<Option<Edge>> {
        self.get_json(&format!("edge:{}", id))
    }

    fn try_find_pair(&self, pair: &PairKey) -> Result<Option<Edge>> {
        match self.db.get(Self::pair_key(pair).as_bytes())? {
            Some(id) => self.try_get_edge(&String::from_utf8_lossy(&id)),
            None => Ok(None),
        }
    }

    fn try_insert_edge(&self, edge: &Edge) -> std::result::Result<(), StoreError> {
        let pair = edge.pair();
        if self.db.get(Self::pair_key(&pair).as_bytes()).map_err(backend)?.is_some() {
            return Err(StoreError::Conflict(pair.to_string()));
        }
        let batch = self.edge_batch(edge).map_err(backend)?;
        self.db.write(batch).map_err(backend)
    }

    fn try_delete_edge(&self, id: &str) -> Result<()> {
        let Some(edge) = self.try_get_edge(id)? else {
            return Ok(());
        };
        let mut batch = WriteBatch::default();
        batch.delete(format!("edge:{}", edge.id));
        batch.delete(Self::pair_key(&edge.pair()));
        batch.delete(Self::user_edge_key(&edge.user_a, &edge.id));
        batch.delete(Self::user_edge_key(&edge.user_b, &edge.id));
        self.db.write(batch)?;
        Ok(())
    }

    fn try_edges_for(&self, user: &str) -> Result<Vec<Edge>> {
        let prefix = format!("uedge:{}:", hex::encode(user));
        let mut edges = Vec::new();
        for (key, _) in self.scan_prefix(&prefix)? {
            let key = String::from_utf8_lossy(&key);
            if let Some(edge_id) = key.strip_prefix(&prefix) {
                if let Some(edge) = self.try_get_edge(edge_id)? {
                    edges.push(edge);
                }
            }
        }
        edges.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(edges)
    }
}

fn backend<E: std::fmt::Display>(e: E) -> StoreError {
    StoreError::Backend(e.to_string())
}

impl EdgeStore for Storage {
    fn find_pair(&self, pair: &PairKey) -> std::result::Result<Option<Edge>, StoreError> {
        self.try_find_pair(pair).map_err(backend)
    }

    fn get_edge(&self, id: &str) -> std::result::Result<Option<Edge>, StoreError> {
        self.try_get_edge(id).map_err(backend)
    }

    fn insert_edge(&self, edge: &Edge) -> std::result::Result<(), StoreError> {
        self.try_insert_edge(edge)
    }

    fn update_edge(&self, edge: &Edge) -> std::result::Result<(), StoreError> {
        if self.try_get_edge(&edge.id).map_err(backend)?.is_none() {
            return Err(StoreError::Backend(format!("edge {} not found", edge.id)));
        }
        let batch = self.edge_batch(edge).map_err(backend)?;
        self.db.write(batch).map_err(backend)
    }

    fn delete_edge(&self, id: &str) -> std::result::Result<(), StoreError> {
        self.try_delete_edge(id).map_err(backend)
    }

    fn edges_for(&self, user: &str) -> std::result::Result<Vec<Edge>, StoreError> {
        self.try_edges_for(user).map_err(backend)
    }
}
