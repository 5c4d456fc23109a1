//! Board, Module and Library Catalogs
//!
//! The catalogs are fixed input data: which boards exist and what their pins
//! can do, which peripheral modules can be attached and what source fragments
//! they contribute, and which Arduino libraries those fragments need.
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//! │    Boards    │   │   Modules    │   │  Libraries   │
//! │ (pin tables) │   │ (templates)  │   │(descriptors) │
//! └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!        │                  │ validate          │
//!        └──────────────────┼───────────────────┘
//!                           ▼
//!                    ┌──────────────┐
//!                    │   Catalog    │
//!                    └──────────────┘
//! ```
//!
//! Every module entry is checked on load: its fragments may only reference
//! placeholders an addition can resolve (see [`validate`]).

pub mod builtin;
pub mod schema;
pub mod validate;

use std::path::Path;

pub use schema::{LibraryDefinition, ModuleCategory, ModuleDefinition, TopicType};

use crate::hardware::BoardDefinition;

/// Board used when none is chosen or an unknown id is requested.
pub const DEFAULT_BOARD_ID: &str = "esp32-devkit-v1";

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Failed to parse catalog entry {origin}: {message}")]
    Parse { origin: String, message: String },
    #[error("Module '{module}' fragment '{fragment}' uses undeclared placeholder(s): {}", .tokens.join(", "))]
    InvalidTemplate {
        module: String,
        fragment: String,
        tokens: Vec<String>,
    },
    #[error("Duplicate {kind} id '{id}'")]
    DuplicateId { kind: &'static str, id: String },
    #[error("A {kind} entry has an empty id")]
    EmptyId { kind: &'static str },
    #[error("Board '{board}' default {bus} pin GPIO {gpio} is not on the board")]
    InvalidBusPin {
        board: String,
        bus: &'static str,
        gpio: u8,
    },
    #[error("Catalog contains no boards")]
    NoBoards,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
pub struct Catalog {
    boards: Vec<BoardDefinition>,
    modules: Vec<ModuleDefinition>,
    libraries: Vec<LibraryDefinition>,
}

impl Catalog {
    /// Build a catalog, validating every board and module entry.
    pub fn new(
        boards: Vec<BoardDefinition>,
        modules: Vec<ModuleDefinition>,
        libraries: Vec<LibraryDefinition>,
    ) -> Result<Self, CatalogError> {
        if boards.is_empty() {
            return Err(CatalogError::NoBoards);
        }
        for (i, board) in boards.iter().enumerate() {
            validate::validate_board(board)?;
            if boards[..i].iter().any(|b| b.id == board.id) {
                return Err(CatalogError::DuplicateId {
                    kind: "board",
                    id: board.id.clone(),
                });
            }
        }
        for (i, def) in modules.iter().enumerate() {
            validate::validate_module(def)?;
            if modules[..i].iter().any(|m| m.id == def.id) {
                return Err(CatalogError::DuplicateId {
                    kind: "module",
                    id: def.id.clone(),
                });
            }
        }
        for (i, lib) in libraries.iter().enumerate() {
            if libraries[..i].iter().any(|l| l.id == lib.id) {
                return Err(CatalogError::DuplicateId {
                    kind: "library",
                    id: lib.id.clone(),
                });
            }
        }

        tracing::info!(
            "Catalog ready: {} boards, {} modules, {} libraries",
            boards.len(),
            modules.len(),
            libraries.len()
        );

        Ok(Self {
            boards,
            modules,
            libraries,
        })
    }

    /// The catalog compiled into the crate.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::new(
            builtin::builtin_boards()?,
            builtin::builtin_modules()?,
            builtin::builtin_libraries()?,
        )
    }

    /// Add user module definitions from `dir`, replacing built-ins with the
    /// same id. Returns per-file error messages for entries that were skipped.
    pub fn load_user_modules(&mut self, dir: &Path) -> Vec<String> {
        let (modules, errors) = builtin::load_modules_from_directory(dir);
        for def in modules {
            self.upsert_module(def);
        }
        errors
    }

    /// Validate and insert a module definition, replacing one with the same id.
    pub fn insert_module(&mut self, def: ModuleDefinition) -> Result<(), CatalogError> {
        validate::validate_module(&def)?;
        self.upsert_module(def);
        Ok(())
    }

    fn upsert_module(&mut self, def: ModuleDefinition) {
        match self.modules.iter_mut().find(|m| m.id == def.id) {
            Some(existing) => {
                tracing::info!("Overriding built-in module '{}'", def.id);
                *existing = def;
            }
            None => self.modules.push(def),
        }
    }

    pub fn boards(&self) -> &[BoardDefinition] {
        &self.boards
    }

    pub fn modules(&self) -> &[ModuleDefinition] {
        &self.modules
    }

    pub fn libraries(&self) -> &[LibraryDefinition] {
        &self.libraries
    }

    pub fn board(&self, id: &str) -> Option<&BoardDefinition> {
        self.boards.iter().find(|b| b.id == id)
    }

    pub fn default_board(&self) -> &BoardDefinition {
        // `new` rejects an empty board list
        self.board(DEFAULT_BOARD_ID).unwrap_or(&self.boards[0])
    }

    /// Look up a board, falling back to the default for unknown ids.
    pub fn board_or_default(&self, id: &str) -> &BoardDefinition {
        match self.board(id) {
            Some(board) => board,
            None => {
                let fallback = self.default_board();
                tracing::warn!("Unknown board '{}', falling back to '{}'", id, fallback.id);
                fallback
            }
        }
    }

    pub fn module(&self, id: &str) -> Option<&ModuleDefinition> {
        self.modules.iter().find(|m| m.id == id)
    }

    pub fn modules_in_category(&self, category: ModuleCategory) -> Vec<&ModuleDefinition> {
        self.modules.iter().filter(|m| m.category == category).collect()
    }

    pub fn library(&self, id: &str) -> Option<&LibraryDefinition> {
        self.libraries.iter().find(|l| l.id == id)
    }
}
