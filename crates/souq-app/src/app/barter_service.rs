//! Barter use cases: listing items, preferences, matching and acceptance

use serde::{Deserialize, Serialize};

use souq_domain::model::{
    BarterChain, BarterItem, BarterMatchResult, BarterPreference, ItemStatus, MatchOptions,
    NewBarterItem,
};
use souq_domain::service::{find_chains, verify_chain};
use souq_infra::Repositories;
use souq_types::{Error, Result};

use super::current_year;
use super::pricing_service::PricingService;

/// Chain acceptance payload: item ids in transfer order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcceptChainRequest {
    pub item_ids: Vec<String>,
}

#[derive(Clone)]
pub struct BarterService {
    repos: Repositories,
    pricing: PricingService,
    options: MatchOptions,
}

impl BarterService {
    pub fn new(repos: Repositories, pricing: PricingService, options: MatchOptions) -> Self {
        Self {
            repos,
            pricing,
            options,
        }
    }

    pub fn options(&self) -> &MatchOptions {
        &self.options
    }

    /// List an item for `owner`. Vehicles are appraised when market data allows.
    pub fn list_item(&self, owner: &str, request: &NewBarterItem) -> Result<BarterItem> {
        let mut item = request.validate(owner, current_year())?;
        if let Some(vehicle) = &item.vehicle {
            match self.pricing.estimate_input(vehicle) {
                Ok(estimate) => item.appraised_value = Some(estimate.point),
                Err(Error::InsufficientMarketData(msg)) => {
                    tracing::warn!(owner, title = %item.title, %msg, "item not appraised");
                }
                Err(e) => return Err(e),
            }
        }
        self.repos.barter_items.save(&item)?;
        tracing::info!(
            id = %item.id,
            owner,
            value = item.value(),
            appraised = item.appraised_value.is_some(),
            "barter item listed"
        );
        Ok(item)
    }

    pub fn items_of(&self, owner: &str) -> Result<Vec<BarterItem>> {
        let mut items = self.repos.barter_items.find_by_owner(owner)?;
        items.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(items)
    }

    /// Withdraw an available item. Only its owner may do so.
    pub fn withdraw(&self, user: &str, item_id: &str) -> Result<BarterItem> {
        let item = self
            .repos
            .barter_items
            .find_by_id(item_id)?
            .ok_or_else(|| Error::not_found(format!("barter item {}", item_id)))?;
        if item.owner != user {
            return Err(Error::Forbidden(format!(
                "barter item {} belongs to another user",
                item_id
            )));
        }
        if item.status == ItemStatus::Withdrawn {
            return Ok(item);
        }
        match self
            .repos
            .barter_items
            .set_status_if_available(&[item_id], ItemStatus::Withdrawn)
        {
            Ok(mut updated) => updated
                .pop()
                .ok_or_else(|| Error::not_found(format!("barter item {}", item_id))),
            Err(Error::Conflict(_)) => Err(Error::Conflict(format!(
                "barter item {} is already matched",
                item_id
            ))),
            Err(e) => Err(e),
        }
    }

    /// Replace `user`'s preference
    pub fn set_preference(&self, user: &str, mut preference: BarterPreference) -> Result<BarterPreference> {
        preference.user = user.to_string();
        preference.validate()?;
        self.repos.barter_preferences.save(&preference)?;
        Ok(preference)
    }

    pub fn preference_of(&self, user: &str) -> Result<Option<BarterPreference>> {
        self.repos.barter_preferences.find_by_user(user)
    }

    /// Every chain over the current available items
    pub fn all_matches(&self) -> Result<BarterMatchResult> {
        self.matches_with(&self.options)
    }

    pub fn matches_with(&self, options: &MatchOptions) -> Result<BarterMatchResult> {
        let items = self.repos.barter_items.find_available()?;
        let preferences = self.repos.barter_preferences.find_all()?;
        Ok(find_chains(&items, &preferences, options))
    }

    /// Chains `user` takes part in
    pub fn matches_for(&self, user: &str) -> Result<BarterMatchResult> {
        Ok(self.all_matches()?.involving(user))
    }

    /// Accept a chain on behalf of one of its participants.
    ///
    /// The chain is re-validated against current data; if any item has
    /// moved or a preference changed so it no longer closes, the call
    /// fails with a conflict and nothing is changed. Items are marked
    /// matched in one store change that re-checks availability, so two
    /// overlapping chains accepted at once cannot both succeed.
    pub fn accept_chain(&self, user: &str, request: &AcceptChainRequest) -> Result<BarterChain> {
        if request.item_ids.len() < 2 {
            return Err(Error::invalid("a chain needs at least two items"));
        }
        let items = self.repos.barter_items.find_available()?;
        let preferences = self.repos.barter_preferences.find_all()?;
        let chain = verify_chain(&request.item_ids, &items, &preferences, &self.options)
            .ok_or_else(|| Error::Conflict("chain is no longer valid".to_string()))?;
        if !chain.involves(user) {
            return Err(Error::Forbidden("caller is not part of this chain".to_string()));
        }

        self.repos
            .barter_items
            .set_status_if_available(&chain.item_ids(), ItemStatus::Matched)
            .map_err(|e| match e {
                Error::NotFound(_) | Error::Conflict(_) => {
                    Error::Conflict("chain is no longer valid".to_string())
                }
                other => other,
            })?;
        tracing::info!(
            user,
            items = chain.len(),
            total_value = chain.total_value,
            "barter chain accepted"
        );
        Ok(chain)
    }
}
