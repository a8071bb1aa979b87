use thiserror::Error;

use crate::model::{IngredientDraftLine, RawDraft, RecipeDraft, StepDraftLine};
use crate::normalize::{normalize_ingredient, normalize_steps};

/// A mutation referenced an ingredient or step that does not exist
#[derive(Error, Debug, PartialEq, Eq)]
#[error("index {index} is out of range (len {len})")]
pub struct IndexOutOfRange {
    pub index: usize,
    pub len: usize,
}

/// Scalar draft fields the reviewer can edit directly
#[derive(Debug, Clone)]
pub enum DraftField {
    Title(String),
    Description(Option<String>),
    PrepTime(Option<u32>),
    CookTime(Option<u32>),
    Servings(Option<u32>),
}

/// Partial update for one ingredient line. `unit` and `notes` use a nested
/// Option so a patch can distinguish "leave as is" from "clear the field".
#[derive(Debug, Clone, Default)]
pub struct IngredientPatch {
    pub name: Option<String>,
    pub quantity: Option<f64>,
    pub unit: Option<Option<String>>,
    pub notes: Option<Option<String>>,
}

/// In-memory, single-writer holder of the draft between extraction and
/// commit. Lives for one review session; discarded on cancel or after a
/// successful commit.
///
/// Every mutation bumps the revision counter and re-derives contiguous
/// 1..N step numbering, so a snapshot taken for commit can be told apart
/// from a draft that was edited afterwards.
#[derive(Debug, Clone)]
pub struct DraftStore {
    draft: RecipeDraft,
    revision: u64,
}

impl DraftStore {
    /// Build the editable draft from an extraction result, running every
    /// ingredient line and step line through the normalizer.
    pub fn load(raw: RawDraft) -> Self {
        let draft = RecipeDraft {
            title: raw.title.unwrap_or_default(),
            description: raw.description,
            prep_time: raw.prep_time,
            cook_time: raw.cook_time,
            servings: raw.servings,
            ingredients: raw
                .ingredient_lines
                .iter()
                .map(|line| normalize_ingredient(line))
                .collect(),
            steps: normalize_steps(&raw.step_lines),
        };

        DraftStore { draft, revision: 0 }
    }

    pub fn draft(&self) -> &RecipeDraft {
        &self.draft
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Owned copy of the current draft. Commit works on a snapshot, never
    /// on a live reference, so an edit racing a commit cannot corrupt the
    /// write.
    pub fn snapshot(&self) -> RecipeDraft {
        self.draft.clone()
    }

    pub fn update_field(&mut self, field: DraftField) {
        match field {
            DraftField::Title(title) => self.draft.title = title,
            DraftField::Description(description) => self.draft.description = description,
            DraftField::PrepTime(minutes) => self.draft.prep_time = minutes,
            DraftField::CookTime(minutes) => self.draft.cook_time = minutes,
            DraftField::Servings(servings) => self.draft.servings = servings,
        }
        self.touch();
    }

    /// Append a blank ingredient line for the reviewer to fill in
    pub fn add_ingredient(&mut self) -> usize {
        self.draft.ingredients.push(IngredientDraftLine::default());
        self.touch();
        self.draft.ingredients.len() - 1
    }

    pub fn remove_ingredient(&mut self, index: usize) -> Result<(), IndexOutOfRange> {
        self.check_index(index, self.draft.ingredients.len())?;
        self.draft.ingredients.remove(index);
        self.touch();
        Ok(())
    }

    pub fn update_ingredient(
        &mut self,
        index: usize,
        patch: IngredientPatch,
    ) -> Result<(), IndexOutOfRange> {
        self.check_index(index, self.draft.ingredients.len())?;
        let line = &mut self.draft.ingredients[index];
        if let Some(name) = patch.name {
            line.name = name;
        }
        if let Some(quantity) = patch.quantity {
            line.quantity = quantity;
        }
        if let Some(unit) = patch.unit {
            line.unit = unit;
        }
        if let Some(notes) = patch.notes {
            line.notes = notes;
        }
        self.touch();
        Ok(())
    }

    /// Append a blank step; numbering is re-derived as for every mutation
    pub fn add_step(&mut self) -> usize {
        self.draft.steps.push(StepDraftLine {
            step_number: 0, // assigned by renumber below
            description: String::new(),
        });
        self.touch();
        self.draft.steps.len() - 1
    }

    pub fn remove_step(&mut self, index: usize) -> Result<(), IndexOutOfRange> {
        self.check_index(index, self.draft.steps.len())?;
        self.draft.steps.remove(index);
        self.touch();
        Ok(())
    }

    pub fn update_step(&mut self, index: usize, description: String) -> Result<(), IndexOutOfRange> {
        self.check_index(index, self.draft.steps.len())?;
        self.draft.steps[index].description = description;
        self.touch();
        Ok(())
    }

    /// Move the step at `from` so it sits at position `to`
    pub fn reorder_steps(&mut self, from: usize, to: usize) -> Result<(), IndexOutOfRange> {
        let len = self.draft.steps.len();
        self.check_index(from, len)?;
        self.check_index(to, len)?;
        let step = self.draft.steps.remove(from);
        self.draft.steps.insert(to, step);
        self.touch();
        Ok(())
    }

    fn check_index(&self, index: usize, len: usize) -> Result<(), IndexOutOfRange> {
        if index < len {
            Ok(())
        } else {
            Err(IndexOutOfRange { index, len })
        }
    }

    /// Post-condition of every mutation: bump the revision and restore the
    /// contiguous 1..N step numbering.
    fn touch(&mut self) {
        self.revision += 1;
        for (i, step) in self.draft.steps.iter_mut().enumerate() {
            step.step_number = i as u32 + 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_steps() -> DraftStore {
        DraftStore::load(RawDraft {
            title: Some("Bread".to_string()),
            ingredient_lines: vec!["500 g flour".to_string(), "1 tsp salt".to_string()],
            step_lines: vec![
                "Preheat oven".to_string(),
                "Mix".to_string(),
                "Bake".to_string(),
            ],
            ..Default::default()
        })
    }

    fn numbers(store: &DraftStore) -> Vec<u32> {
        store.draft().steps.iter().map(|s| s.step_number).collect()
    }

    #[test]
    fn load_normalizes_lines() {
        let store = store_with_steps();
        assert_eq!(store.draft().ingredients[0].name, "flour");
        assert_eq!(store.draft().ingredients[0].unit.as_deref(), Some("g"));
        assert_eq!(numbers(&store), vec![1, 2, 3]);
        assert_eq!(store.revision(), 0);
    }

    #[test]
    fn remove_step_renumbers_contiguously() {
        let mut store = store_with_steps();
        store.remove_step(1).unwrap();
        assert_eq!(numbers(&store), vec![1, 2]);
        assert_eq!(store.draft().steps[1].description, "Bake");
    }

    #[test]
    fn reorder_steps_renumbers_contiguously() {
        let mut store = store_with_steps();
        store.reorder_steps(2, 0).unwrap();
        assert_eq!(store.draft().steps[0].description, "Bake");
        assert_eq!(numbers(&store), vec![1, 2, 3]);
    }

    #[test]
    fn every_mutation_bumps_revision() {
        let mut store = store_with_steps();
        store.update_field(DraftField::Title("Sourdough".to_string()));
        assert_eq!(store.revision(), 1);
        store.add_ingredient();
        assert_eq!(store.revision(), 2);
        store.add_step();
        assert_eq!(store.revision(), 3);
        // Numbering holds after the append as well
        assert_eq!(numbers(&store), vec![1, 2, 3, 4]);
    }

    #[test]
    fn failed_mutation_leaves_revision_alone() {
        let mut store = store_with_steps();
        assert!(store.remove_ingredient(9).is_err());
        assert_eq!(store.revision(), 0);
    }

    #[test]
    fn patch_can_clear_unit_and_notes() {
        let mut store = store_with_steps();
        store
            .update_ingredient(
                0,
                IngredientPatch {
                    unit: Some(None),
                    notes: Some(Some("sifted".to_string())),
                    ..Default::default()
                },
            )
            .unwrap();

        let line = &store.draft().ingredients[0];
        assert!(line.unit.is_none());
        assert_eq!(line.notes.as_deref(), Some("sifted"));
        assert_eq!(line.name, "flour");
    }

    #[test]
    fn snapshot_is_isolated_from_later_edits() {
        let mut store = store_with_steps();
        let snapshot = store.snapshot();
        store.update_field(DraftField::Title("Changed".to_string()));
        assert_eq!(snapshot.title, "Bread");
        assert_eq!(store.draft().title, "Changed");
    }
}
