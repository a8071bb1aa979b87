use async_trait::async_trait;
use log::{debug, info};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use crate::config::BackendConfig;
use crate::error::{CommitError, StoreError};
use crate::model::{IngredientDraftLine, IngredientRecord, RecipeDraft, StepDraftLine};

/// The collaborator CRUD store the pipeline persists into. One method per
/// record kind; every call is an ordinary row creation, nothing here needs
/// multi-row locking.
#[async_trait]
pub trait RecipeStore: Send + Sync {
    /// Look up a shared ingredient by name, case-insensitively
    async fn find_ingredient(&self, name: &str) -> Result<Option<IngredientRecord>, StoreError>;

    async fn create_ingredient(&self, name: &str) -> Result<IngredientRecord, StoreError>;

    /// Create the recipe record from the draft's scalar fields, returning
    /// the new recipe id
    async fn create_recipe(&self, draft: &RecipeDraft) -> Result<u64, StoreError>;

    async fn create_recipe_item(
        &self,
        recipe_id: u64,
        ingredient_id: u64,
        line: &IngredientDraftLine,
    ) -> Result<(), StoreError>;

    async fn create_recipe_step(
        &self,
        recipe_id: u64,
        step: &StepDraftLine,
    ) -> Result<(), StoreError>;
}

/// Persists a reviewed draft as one logical transaction: recipe, then
/// ingredient lines (finding or creating each shared ingredient), then
/// steps. The store offers no real transaction, so a failure after the
/// recipe record exists is reported as `CommitError::Partial` with the
/// recipe id — the caller decides between retrying the remainder and
/// deleting the partial recipe. Commits are never retried automatically
/// and are not idempotent: committing the same draft twice creates two
/// recipes.
pub struct CommitCoordinator<S> {
    store: S,
}

impl<S: RecipeStore> CommitCoordinator<S> {
    pub fn new(store: S) -> Self {
        CommitCoordinator { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub async fn commit(&self, draft: &RecipeDraft) -> Result<u64, CommitError> {
        // Validation gate: nothing is written unless the draft passes
        validate(draft)?;

        let recipe_id = self.store.create_recipe(draft).await?;
        debug!("Created recipe {}", recipe_id);

        // Ingredient lines, preserving draft order
        for line in &draft.ingredients {
            let name = line.name.trim();
            if name.is_empty() {
                continue;
            }

            let ingredient = self
                .resolve_ingredient(name)
                .await
                .map_err(|source| CommitError::Partial { recipe_id, source })?;

            self.store
                .create_recipe_item(recipe_id, ingredient.id, line)
                .await
                .map_err(|source| CommitError::Partial { recipe_id, source })?;
        }

        for step in &draft.steps {
            self.store
                .create_recipe_step(recipe_id, step)
                .await
                .map_err(|source| CommitError::Partial { recipe_id, source })?;
        }

        info!(
            "Committed recipe {} with {} ingredients and {} steps",
            recipe_id,
            draft.ingredients.len(),
            draft.steps.len()
        );

        Ok(recipe_id)
    }

    async fn resolve_ingredient(&self, name: &str) -> Result<IngredientRecord, StoreError> {
        if let Some(existing) = self.store.find_ingredient(name).await? {
            return Ok(existing);
        }
        self.store.create_ingredient(name).await
    }
}

fn validate(draft: &RecipeDraft) -> Result<(), CommitError> {
    if draft.title.trim().is_empty() {
        return Err(CommitError::Invalid("a recipe title is required".to_string()));
    }
    if draft.ingredients.is_empty() {
        return Err(CommitError::Invalid(
            "at least one ingredient is required".to_string(),
        ));
    }
    Ok(())
}

/// `RecipeStore` over the backend's REST CRUD endpoints. Attaches the
/// ambient bearer token to every call; issuing or refreshing that token
/// is the auth subsystem's concern, not this client's.
pub struct HttpRecipeStore {
    client: Client,
    base_url: String,
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreatedRecipe {
    id: u64,
}

impl HttpRecipeStore {
    pub fn new(config: &BackendConfig) -> Self {
        HttpRecipeStore {
            client: Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let builder = self
            .client
            .request(method, format!("{}{}", self.base_url, path));
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, StoreError> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            Err(StoreError::Status(status.as_u16()))
        }
    }
}

#[async_trait]
impl RecipeStore for HttpRecipeStore {
    async fn find_ingredient(&self, name: &str) -> Result<Option<IngredientRecord>, StoreError> {
        let response = self
            .request(reqwest::Method::GET, "/ingredients/")
            .query(&[("name", name)])
            .send()
            .await?;

        let candidates: Vec<IngredientRecord> = Self::check(response).await?.json().await?;
        Ok(candidates
            .into_iter()
            .find(|record| record.name.eq_ignore_ascii_case(name)))
    }

    async fn create_ingredient(&self, name: &str) -> Result<IngredientRecord, StoreError> {
        let response = self
            .request(reqwest::Method::POST, "/ingredients/")
            .json(&json!({ "name": name }))
            .send()
            .await?;

        Ok(Self::check(response).await?.json().await?)
    }

    async fn create_recipe(&self, draft: &RecipeDraft) -> Result<u64, StoreError> {
        let response = self
            .request(reqwest::Method::POST, "/recipes/")
            .json(&json!({
                "title": draft.title,
                "description": draft.description,
                "prep_time": draft.prep_time,
                "cook_time": draft.cook_time,
                "servings": draft.servings,
            }))
            .send()
            .await?;

        let created: CreatedRecipe = Self::check(response).await?.json().await?;
        Ok(created.id)
    }

    async fn create_recipe_item(
        &self,
        recipe_id: u64,
        ingredient_id: u64,
        line: &IngredientDraftLine,
    ) -> Result<(), StoreError> {
        let response = self
            .request(reqwest::Method::POST, &format!("/recipes/{recipe_id}/items/"))
            .json(&json!({
                "ingredient_id": ingredient_id,
                "quantity": line.quantity,
                "unit": line.unit,
                "notes": line.notes,
            }))
            .send()
            .await?;

        Self::check(response).await?;
        Ok(())
    }

    async fn create_recipe_step(
        &self,
        recipe_id: u64,
        step: &StepDraftLine,
    ) -> Result<(), StoreError> {
        let response = self
            .request(reqwest::Method::POST, &format!("/recipes/{recipe_id}/steps/"))
            .json(&json!({
                "step_number": step.step_number,
                "description": step.description,
            }))
            .send()
            .await?;

        Self::check(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Mutex;

    /// In-memory store recording every write, with an optional failure
    /// injected after N successful calls
    #[derive(Default)]
    struct StubStore {
        calls: AtomicU64,
        fail_after: Option<u64>,
        ingredients: Mutex<Vec<String>>,
        items: Mutex<Vec<(u64, f64, Option<String>, String, Option<String>)>>,
        steps: Mutex<Vec<(u64, u32)>>,
        recipes: Mutex<Vec<String>>,
    }

    impl StubStore {
        fn failing_after(calls: u64) -> Self {
            StubStore {
                fail_after: Some(calls),
                ..Default::default()
            }
        }

        fn tick(&self) -> Result<(), StoreError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(limit) = self.fail_after {
                if n >= limit {
                    return Err(StoreError::Status(503));
                }
            }
            Ok(())
        }
    }

    #[async_trait]
    impl RecipeStore for StubStore {
        async fn find_ingredient(
            &self,
            name: &str,
        ) -> Result<Option<IngredientRecord>, StoreError> {
            self.tick()?;
            let ingredients = self.ingredients.lock().unwrap();
            Ok(ingredients
                .iter()
                .position(|n| n.eq_ignore_ascii_case(name))
                .map(|i| IngredientRecord {
                    id: i as u64 + 1,
                    name: ingredients[i].clone(),
                }))
        }

        async fn create_ingredient(&self, name: &str) -> Result<IngredientRecord, StoreError> {
            self.tick()?;
            let mut ingredients = self.ingredients.lock().unwrap();
            ingredients.push(name.to_string());
            Ok(IngredientRecord {
                id: ingredients.len() as u64,
                name: name.to_string(),
            })
        }

        async fn create_recipe(&self, draft: &RecipeDraft) -> Result<u64, StoreError> {
            self.tick()?;
            let mut recipes = self.recipes.lock().unwrap();
            recipes.push(draft.title.clone());
            Ok(recipes.len() as u64)
        }

        async fn create_recipe_item(
            &self,
            recipe_id: u64,
            _ingredient_id: u64,
            line: &IngredientDraftLine,
        ) -> Result<(), StoreError> {
            self.tick()?;
            self.items.lock().unwrap().push((
                recipe_id,
                line.quantity,
                line.unit.clone(),
                line.name.clone(),
                line.notes.clone(),
            ));
            Ok(())
        }

        async fn create_recipe_step(
            &self,
            recipe_id: u64,
            step: &StepDraftLine,
        ) -> Result<(), StoreError> {
            self.tick()?;
            self.steps.lock().unwrap().push((recipe_id, step.step_number));
            Ok(())
        }
    }

    fn draft() -> RecipeDraft {
        RecipeDraft {
            title: "Chili".to_string(),
            ingredients: vec![
                IngredientDraftLine {
                    raw_text: "2 cans beans".to_string(),
                    name: "beans".to_string(),
                    quantity: 2.0,
                    unit: None,
                    notes: None,
                },
                IngredientDraftLine {
                    raw_text: "1 onion".to_string(),
                    name: "onion".to_string(),
                    quantity: 1.0,
                    unit: None,
                    notes: None,
                },
            ],
            steps: vec![
                StepDraftLine {
                    step_number: 1,
                    description: "Chop the onion".to_string(),
                },
                StepDraftLine {
                    step_number: 2,
                    description: "Simmer everything".to_string(),
                },
            ],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn commit_writes_recipe_items_and_steps_in_order() {
        let draft = draft();
        let coordinator = CommitCoordinator::new(StubStore::default());
        let id = coordinator.commit(&draft).await.unwrap();

        assert_eq!(id, 1);
        let store = coordinator.store();
        assert_eq!(*store.ingredients.lock().unwrap(), vec!["beans", "onion"]);
        assert_eq!(*store.steps.lock().unwrap(), vec![(1, 1), (1, 2)]);

        // Round trip: the persisted lines carry the draft's ordered
        // quantity/unit/name/notes tuples
        let expected: Vec<_> = draft
            .ingredients
            .iter()
            .map(|l| (id, l.quantity, l.unit.clone(), l.name.clone(), l.notes.clone()))
            .collect();
        assert_eq!(*store.items.lock().unwrap(), expected);
    }

    #[tokio::test]
    async fn existing_ingredient_is_reused_case_insensitively() {
        let store = StubStore::default();
        store.ingredients.lock().unwrap().push("Beans".to_string());

        let coordinator = CommitCoordinator::new(store);
        coordinator.commit(&draft()).await.unwrap();

        // "beans" matched the existing "Beans"; only "onion" was created
        assert_eq!(
            *coordinator.store().ingredients.lock().unwrap(),
            vec!["Beans", "onion"]
        );
    }

    #[tokio::test]
    async fn empty_ingredients_fail_validation_with_zero_writes() {
        let coordinator = CommitCoordinator::new(StubStore::default());
        let invalid = RecipeDraft {
            title: "Chili".to_string(),
            ..Default::default()
        };

        let result = coordinator.commit(&invalid).await;
        assert!(matches!(result, Err(CommitError::Invalid(_))));
        assert!(coordinator.store().recipes.lock().unwrap().is_empty());
        assert_eq!(coordinator.store().calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn empty_title_fails_validation() {
        let coordinator = CommitCoordinator::new(StubStore::default());
        let mut invalid = draft();
        invalid.title = "   ".to_string();

        assert!(matches!(
            coordinator.commit(&invalid).await,
            Err(CommitError::Invalid(_))
        ));
    }

    #[tokio::test]
    async fn failure_after_recipe_creation_reports_partial_with_id() {
        // Call 0 creates the recipe; call 1 (first ingredient lookup) fails
        let coordinator = CommitCoordinator::new(StubStore::failing_after(1));

        let result = coordinator.commit(&draft()).await;
        match result {
            Err(CommitError::Partial { recipe_id, .. }) => assert_eq!(recipe_id, 1),
            other => panic!("expected Partial, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn failure_creating_recipe_is_store_unavailable() {
        let coordinator = CommitCoordinator::new(StubStore::failing_after(0));

        assert!(matches!(
            coordinator.commit(&draft()).await,
            Err(CommitError::StoreUnavailable(_))
        ));
        assert!(coordinator.store().recipes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn commit_is_not_idempotent() {
        // Documented behavior: two commits of one draft are two recipes
        let coordinator = CommitCoordinator::new(StubStore::default());
        let draft = draft();

        let first = coordinator.commit(&draft).await.unwrap();
        let second = coordinator.commit(&draft).await.unwrap();

        assert_ne!(first, second);
        assert_eq!(coordinator.store().recipes.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn blank_ingredient_lines_are_skipped() {
        let coordinator = CommitCoordinator::new(StubStore::default());
        let mut d = draft();
        d.ingredients.push(IngredientDraftLine::default());

        coordinator.commit(&d).await.unwrap();
        assert_eq!(coordinator.store().items.lock().unwrap().len(), 2);
    }
}
