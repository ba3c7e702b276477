//! Delivery addresses of the signed-in user.

use std::sync::Arc;

use foodtruck_core::{AddressId, UserId};

use super::auth::AuthController;
use super::auth::validation::AddressForm;
use super::{ServiceError, report_failure};
use crate::backend::AddressTable;
use crate::models::Address;
use crate::notify::Notifier;

/// Address book operations. The first saved address becomes the default.
#[derive(Clone)]
pub struct AddressService {
    table: Arc<dyn AddressTable>,
    auth: AuthController,
    notifier: Arc<dyn Notifier>,
}

impl std::fmt::Debug for AddressService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AddressService").finish_non_exhaustive()
    }
}

/// Address pre-selected at checkout: the default, else the first.
///
/// `None` means the user has to enter one.
#[must_use]
pub fn preselected(addresses: &[Address]) -> Option<&Address> {
    addresses
        .iter()
        .find(|a| a.is_default)
        .or_else(|| addresses.first())
}

impl AddressService {
    #[must_use]
    pub fn new(
        table: Arc<dyn AddressTable>,
        auth: AuthController,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            table,
            auth,
            notifier,
        }
    }

    fn user_id(&self) -> Result<UserId, ServiceError> {
        self.auth.current_user_id().ok_or(ServiceError::NotSignedIn)
    }

    /// The user's addresses, default first.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotSignedIn` without a user and
    /// `ServiceError::Backend` when the lookup fails.
    pub async fn list(&self) -> Result<Vec<Address>, ServiceError> {
        let user_id = self.user_id()?;
        self.table
            .list_for_user(user_id)
            .await
            .map_err(|e| report_failure(self.notifier.as_ref(), e, "Failed to load addresses"))
    }

    /// One of the user's addresses.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` when the id is not one of theirs.
    pub async fn get(&self, id: AddressId) -> Result<Address, ServiceError> {
        self.list()
            .await?
            .into_iter()
            .find(|a| a.id == id)
            .ok_or_else(|| ServiceError::NotFound("Address".to_string()))
    }

    /// Save a new address.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Validation` for missing fields (nothing is
    /// sent) and `ServiceError::Backend` when the insert fails.
    pub async fn add(&self, form: &AddressForm) -> Result<Address, ServiceError> {
        let address = form.validate()?;
        let existing = self.list().await?;
        let is_first = existing.is_empty();

        let saved = self
            .table
            .insert(self.user_id()?, &address, is_first)
            .await
            .map_err(|e| {
                report_failure::<ServiceError>(self.notifier.as_ref(), e, "Failed to add address")
            })?;
        tracing::info!(address_id = %saved.id, is_default = is_first, "address added");
        self.notifier.success("Address added successfully");
        Ok(saved)
    }

    /// Replace the fields of one of the user's addresses.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Validation` for missing fields,
    /// `ServiceError::NotFound` for someone else's address and
    /// `ServiceError::Backend` when the update fails.
    pub async fn update(&self, id: AddressId, form: &AddressForm) -> Result<(), ServiceError> {
        let address = form.validate()?;
        self.get(id).await?;
        self.table
            .update(id, &address)
            .await
            .map_err(|e| {
                report_failure::<ServiceError>(
                    self.notifier.as_ref(),
                    e,
                    "Failed to update address",
                )
            })?;
        self.notifier.success("Address updated");
        Ok(())
    }

    /// Make `id` the user's only default address.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` for someone else's address and
    /// `ServiceError::Backend` when the update fails.
    pub async fn set_default(&self, id: AddressId) -> Result<(), ServiceError> {
        self.get(id).await?;
        self.table
            .set_default(self.user_id()?, id)
            .await
            .map_err(|e| {
                report_failure::<ServiceError>(
                    self.notifier.as_ref(),
                    e,
                    "Failed to set default address",
                )
            })?;
        self.notifier.success("Default address updated");
        Ok(())
    }

    /// Delete one of the user's addresses.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` for someone else's address and
    /// `ServiceError::Backend` when the delete fails.
    pub async fn delete(&self, id: AddressId) -> Result<(), ServiceError> {
        self.get(id).await?;
        self.table
            .delete(id)
            .await
            .map_err(|e| {
                report_failure::<ServiceError>(
                    self.notifier.as_ref(),
                    e,
                    "Failed to delete address",
                )
            })?;
        self.notifier.success("Address removed");
        Ok(())
    }
}
