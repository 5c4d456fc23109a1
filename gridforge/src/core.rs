//! Planning and generation entry points shared by the CLI and library users.

use std::path::{Path, PathBuf};

use serde::Serialize;
use uuid::Uuid;

use crate::catalog::{Catalog, CatalogError};
use crate::generator::{FirmwareGenerator, GeneratedFirmware, RenderError};
use crate::project::{AllocationError, Project};

#[derive(Debug, thiserror::Error)]
pub enum GridForgeError {
    #[error("Allocation error: {0}")]
    Allocation(#[from] AllocationError),
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),
    #[error("Render error: {0}")]
    Render(#[from] RenderError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// One placeholder → pin row of a plan.
#[derive(Debug, Clone, Serialize)]
pub struct PinAssignment {
    pub placeholder: String,
    pub gpio: u8,
    pub label: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlannedModule {
    pub instance_id: Uuid,
    pub short_id: String,
    pub definition_id: String,
    pub name: String,
    pub pins: Vec<PinAssignment>,
}

/// Human-facing summary of a project's pin assignment.
#[derive(Debug, Clone, Serialize)]
pub struct PlanReport {
    pub board: String,
    pub board_name: String,
    pub modules: Vec<PlannedModule>,
    pub estimated_current_ma: f32,
    pub max_current_ma: Option<u32>,
}

impl PlanReport {
    pub fn over_budget(&self) -> bool {
        self.max_current_ma
            .is_some_and(|max| self.estimated_current_ma > max as f32)
    }
}

/// Core API used by the CLI.
pub struct GridForgeCore;

impl GridForgeCore {
    /// Build a project on `board_id` and add `module_ids` in order.
    ///
    /// Unknown boards fall back to the catalog default. The first failing
    /// addition aborts the plan.
    pub fn plan<S: AsRef<str>>(
        catalog: &Catalog,
        board_id: &str,
        module_ids: &[S],
    ) -> Result<Project, GridForgeError> {
        let mut project = Project::new(catalog.board_or_default(board_id).clone());
        for id in module_ids {
            project.add_module(catalog, id.as_ref())?;
        }
        Ok(project)
    }

    pub fn report(catalog: &Catalog, project: &Project) -> PlanReport {
        let board = project.board();
        let modules = project
            .modules()
            .iter()
            .map(|m| PlannedModule {
                instance_id: m.instance_id,
                short_id: m.short_id(),
                definition_id: m.definition_id.clone(),
                name: catalog
                    .module(&m.definition_id)
                    .map(|def| def.name.clone())
                    .unwrap_or_else(|| m.definition_id.clone()),
                pins: m
                    .allocated_pins
                    .iter()
                    .map(|(placeholder, gpio)| PinAssignment {
                        placeholder: placeholder.clone(),
                        gpio: *gpio,
                        label: board.label_for(*gpio),
                    })
                    .collect(),
            })
            .collect();

        PlanReport {
            board: board.id.clone(),
            board_name: board.name.clone(),
            modules,
            estimated_current_ma: project.estimated_current_ma(catalog),
            max_current_ma: board.max_current_total_ma,
        }
    }

    pub fn generate(
        catalog: &Catalog,
        project: &Project,
    ) -> Result<GeneratedFirmware, GridForgeError> {
        let firmware = FirmwareGenerator::new(catalog).generate_project(project)?;
        tracing::info!(
            "Generated {} ({} bytes, {} libraries)",
            firmware.filename,
            firmware.source.len(),
            firmware.libraries.len()
        );
        Ok(firmware)
    }

    /// Write the sketch to `output`. A directory receives the suggested
    /// filename. Returns the path written.
    pub fn write_firmware(
        firmware: &GeneratedFirmware,
        output: &Path,
    ) -> Result<PathBuf, GridForgeError> {
        let path = if output.is_dir() {
            output.join(&firmware.filename)
        } else {
            output.to_path_buf()
        };
        std::fs::write(&path, &firmware.source)?;
        Ok(path)
    }
}
