//! Catalog storage
//!
//! [`CastingStore`] is the seam between the HTTP handlers and persistence.
//! [`MemoryStore`] keeps both tables in memory behind a single lock;
//! identifiers are assigned sequentially from 1 and never reused.

use parking_lot::RwLock;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::info;

use crate::model::{Actor, ActorChanges, Movie, MovieChanges, NewActor, NewMovie};

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Store failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// No record with this id
    #[error("{kind} {id} not found")]
    NotFound {
        /// Record kind (`actor` or `movie`)
        kind: &'static str,
        /// Requested id
        id: u64,
    },

    /// Another record already uses this name or title (case-insensitive)
    #[error("{kind} {value:?} already exists")]
    Duplicate {
        /// Record kind (`actor` or `movie`)
        kind: &'static str,
        /// Conflicting name or title
        value: String,
    },
}

/// Persistence for actors and movies
pub trait CastingStore: Send + Sync + std::fmt::Debug {
    /// All actors in id order
    fn list_actors(&self) -> Vec<Actor>;

    /// A single actor
    fn get_actor(&self, id: u64) -> Option<Actor>;

    /// Insert an actor whose name is not yet taken
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Duplicate`] if the name is taken.
    fn create_actor(&self, actor: NewActor) -> StoreResult<Actor>;

    /// Apply the supplied fields to an existing actor
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for an unknown id and
    /// [`StoreError::Duplicate`] if the new name belongs to another actor.
    fn update_actor(&self, id: u64, changes: ActorChanges) -> StoreResult<Actor>;

    /// Remove an actor
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for an unknown id.
    fn delete_actor(&self, id: u64) -> StoreResult<()>;

    /// All movies in id order
    fn list_movies(&self) -> Vec<Movie>;

    /// A single movie
    fn get_movie(&self, id: u64) -> Option<Movie>;

    /// Insert a movie whose title is not yet taken
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Duplicate`] if the title is taken.
    fn create_movie(&self, movie: NewMovie) -> StoreResult<Movie>;

    /// Apply the supplied fields to an existing movie
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for an unknown id and
    /// [`StoreError::Duplicate`] if the new title belongs to another movie.
    fn update_movie(&self, id: u64, changes: MovieChanges) -> StoreResult<Movie>;

    /// Remove a movie
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for an unknown id.
    fn delete_movie(&self, id: u64) -> StoreResult<()>;
}

#[derive(Debug)]
struct Table<T> {
    rows: BTreeMap<u64, T>,
    next_id: u64,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            next_id: 1,
        }
    }
}

impl<T> Table<T> {
    fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Whether any row other than `except` has a key equal to `value`, ignoring case
    fn is_taken(&self, value: &str, except: Option<u64>, key: impl Fn(&T) -> &str) -> bool {
        let wanted = value.to_lowercase();
        self.rows
            .iter()
            .any(|(id, row)| Some(*id) != except && key(row).to_lowercase() == wanted)
    }
}

#[derive(Debug, Default)]
struct Tables {
    actors: Table<Actor>,
    movies: Table<Movie>,
}

/// In-memory [`CastingStore`]
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl CastingStore for MemoryStore {
    fn list_actors(&self) -> Vec<Actor> {
        self.tables.read().actors.rows.values().cloned().collect()
    }

    fn get_actor(&self, id: u64) -> Option<Actor> {
        self.tables.read().actors.rows.get(&id).cloned()
    }

    fn create_actor(&self, actor: NewActor) -> StoreResult<Actor> {
        let mut tables = self.tables.write();
        let table = &mut tables.actors;
        if table.is_taken(&actor.name, None, |a| &a.name) {
            return Err(StoreError::Duplicate {
                kind: "actor",
                value: actor.name,
            });
        }

        let created = Actor {
            actor_id: table.allocate_id(),
            name: actor.name,
            birth_date: actor.birth_date,
            gender: actor.gender,
        };
        table.rows.insert(created.actor_id, created.clone());
        info!(actor_id = created.actor_id, name = %created.name, "Actor created");
        Ok(created)
    }

    fn update_actor(&self, id: u64, changes: ActorChanges) -> StoreResult<Actor> {
        let mut tables = self.tables.write();
        let table = &mut tables.actors;
        if !table.rows.contains_key(&id) {
            return Err(StoreError::NotFound { kind: "actor", id });
        }
        if let Some(name) = &changes.name
            && table.is_taken(name, Some(id), |a| &a.name)
        {
            return Err(StoreError::Duplicate {
                kind: "actor",
                value: name.clone(),
            });
        }

        let actor = table
            .rows
            .get_mut(&id)
            .ok_or(StoreError::NotFound { kind: "actor", id })?;
        if let Some(name) = changes.name {
            actor.name = name;
        }
        if let Some(birth_date) = changes.birth_date {
            actor.birth_date = birth_date;
        }
        if let Some(gender) = changes.gender {
            actor.gender = gender;
        }
        info!(actor_id = id, "Actor updated");
        Ok(actor.clone())
    }

    fn delete_actor(&self, id: u64) -> StoreResult<()> {
        self.tables
            .write()
            .actors
            .rows
            .remove(&id)
            .ok_or(StoreError::NotFound { kind: "actor", id })?;
        info!(actor_id = id, "Actor deleted");
        Ok(())
    }

    fn list_movies(&self) -> Vec<Movie> {
        self.tables.read().movies.rows.values().cloned().collect()
    }

    fn get_movie(&self, id: u64) -> Option<Movie> {
        self.tables.read().movies.rows.get(&id).cloned()
    }

    fn create_movie(&self, movie: NewMovie) -> StoreResult<Movie> {
        let mut tables = self.tables.write();
        let table = &mut tables.movies;
        if table.is_taken(&movie.title, None, |m| &m.title) {
            return Err(StoreError::Duplicate {
                kind: "movie",
                value: movie.title,
            });
        }

        let created = Movie {
            movie_id: table.allocate_id(),
            title: movie.title,
            release_date: movie.release_date,
        };
        table.rows.insert(created.movie_id, created.clone());
        info!(movie_id = created.movie_id, title = %created.title, "Movie created");
        Ok(created)
    }

    fn update_movie(&self, id: u64, changes: MovieChanges) -> StoreResult<Movie> {
        let mut tables = self.tables.write();
        let table = &mut tables.movies;
        if !table.rows.contains_key(&id) {
            return Err(StoreError::NotFound { kind: "movie", id });
        }
        if let Some(title) = &changes.title
            && table.is_taken(title, Some(id), |m| &m.title)
        {
            return Err(StoreError::Duplicate {
                kind: "movie",
                value: title.clone(),
            });
        }

        let movie = table
            .rows
            .get_mut(&id)
            .ok_or(StoreError::NotFound { kind: "movie", id })?;
        if let Some(title) = changes.title {
            movie.title = title;
        }
        if let Some(release_date) = changes.release_date {
            movie.release_date = release_date;
        }
        info!(movie_id = id, "Movie updated");
        Ok(movie.clone())
    }

    fn delete_movie(&self, id: u64) -> StoreResult<()> {
        self.tables
            .write()
            .movies
            .rows
            .remove(&id)
            .ok_or(StoreError::NotFound { kind: "movie", id })?;
        info!(movie_id = id, "Movie deleted");
        Ok(())
    }
}
