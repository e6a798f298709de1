use thiserror::Error;

use crate::cell::{Cell, CellKey, Interaction, PatternDef};
use crate::model::Viewport;

#[derive(Debug, Error, PartialEq)]
pub enum SceneError {
    #[error("cell `{0}` already exists")]
    DuplicateCell(CellKey),
    #[error("no cell `{0}`")]
    UnknownCell(CellKey),
    #[error("no pattern `{0}`")]
    UnknownPattern(String),
}

/// Drawing surface the visual renders into.
pub trait RenderTarget {
    fn resize(&mut self, viewport: Viewport) -> Result<(), SceneError>;
    fn define_pattern(&mut self, pattern: &PatternDef) -> Result<(), SceneError>;
    fn remove_pattern(&mut self, id: &str) -> Result<(), SceneError>;
    fn create_cell(&mut self, cell: &Cell) -> Result<(), SceneError>;
    fn update_cell(&mut self, cell: &Cell) -> Result<(), SceneError>;
    fn destroy_cell(&mut self, key: &CellKey) -> Result<(), SceneError>;
    fn set_opacity(&mut self, key: &CellKey, opacity: f64) -> Result<(), SceneError>;
    /// Replaces the hover/click bindings with those of the latest cell set.
    fn bind_interactions(&mut self, interactions: Vec<Interaction>) -> Result<(), SceneError>;
}

/// Retained in-memory scene. Cells are kept in draw order.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    pub viewport: Option<Viewport>,
    pub cells: Vec<Cell>,
    pub patterns: Vec<PatternDef>,
    pub interactions: Vec<Interaction>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cell(&self, key: &CellKey) -> Option<&Cell> {
        self.cells.iter().find(|c| &c.key == key)
    }

    pub fn cell_named(&self, name: &str) -> Option<&Cell> {
        self.cells
            .iter()
            .find(|c| matches!(&c.key, CellKey::Category { name: n, .. } if n == name))
    }

    pub fn pattern(&self, id: &str) -> Option<&PatternDef> {
        self.patterns.iter().find(|p| p.id == id)
    }

    /// Topmost interactive cell under the point.
    pub fn hit_test(&self, x: f64, y: f64) -> Option<&Interaction> {
        self.interactions.iter().rev().find(|i| i.rect.contains(x, y))
    }

    fn position(&self, key: &CellKey) -> Result<usize, SceneError> {
        self.cells
            .iter()
            .position(|c| &c.key == key)
            .ok_or_else(|| SceneError::UnknownCell(key.clone()))
    }
}

impl RenderTarget for Scene {
    fn resize(&mut self, viewport: Viewport) -> Result<(), SceneError> {
        self.viewport = Some(viewport);
        Ok(())
    }

    fn define_pattern(&mut self, pattern: &PatternDef) -> Result<(), SceneError> {
        match self.patterns.iter_mut().find(|p| p.id == pattern.id) {
            Some(existing) => *existing = pattern.clone(),
            None => self.patterns.push(pattern.clone()),
        }
        Ok(())
    }

    fn remove_pattern(&mut self, id: &str) -> Result<(), SceneError> {
        let i = self
            .patterns
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| SceneError::UnknownPattern(id.to_string()))?;
        self.patterns.remove(i);
        Ok(())
    }

    fn create_cell(&mut self, cell: &Cell) -> Result<(), SceneError> {
        if self.cell(&cell.key).is_some() {
            return Err(SceneError::DuplicateCell(cell.key.clone()));
        }
        self.cells.push(cell.clone());
        Ok(())
    }

    fn update_cell(&mut self, cell: &Cell) -> Result<(), SceneError> {
        let i = self.position(&cell.key)?;
        self.cells[i] = cell.clone();
        Ok(())
    }

    fn destroy_cell(&mut self, key: &CellKey) -> Result<(), SceneError> {
        let i = self.position(key)?;
        self.cells.remove(i);
        Ok(())
    }

    fn set_opacity(&mut self, key: &CellKey, opacity: f64) -> Result<(), SceneError> {
        let i = self.position(key)?;
        self.cells[i].opacity = opacity;
        Ok(())
    }

    fn bind_interactions(&mut self, interactions: Vec<Interaction>) -> Result<(), SceneError> {
        self.interactions = interactions;
        Ok(())
    }
}
