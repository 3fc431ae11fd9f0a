//! # Vault Registry
//!
//! The directory from asset type to vault, and the only place capabilities
//! are minted. [`VaultRegistry::initialize`] is the single explicit
//! initialization step: it hands back the registry together with the one
//! [`AdminCap`] and the one [`CreditCap`] whose identities every vault it
//! creates will trust.
//!
//! The directory (`asset → vault id`) and the vault records are stored
//! separately so that a registry restored from a snapshot can be checked for
//! consistency: every lookup confirms that the record it lands on carries
//! the id and asset the directory claims.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::asset::AssetId;
use super::error::VaultError;
use super::pool::Vault;
use crate::capability::{AdminCap, Capability, CreditCap};
use crate::config::VaultConfig;
use crate::context::TxContext;

/// Asset type → vault directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultRegistry {
    admin_cap_id: Uuid,
    credit_cap_id: Uuid,
    directory: BTreeMap<AssetId, Uuid>,
    vaults: HashMap<Uuid, Vault>,
}

impl VaultRegistry {
    /// Creates an empty registry and mints its two capabilities.
    ///
    /// This is the only constructor. The caller is responsible for keeping
    /// the returned tokens; there is no way to mint replacements.
    pub fn initialize() -> (Self, AdminCap, CreditCap) {
        let admin = AdminCap::mint();
        let credit = CreditCap::mint();
        let registry = Self {
            admin_cap_id: admin.id(),
            credit_cap_id: credit.id(),
            directory: BTreeMap::new(),
            vaults: HashMap::new(),
        };
        tracing::info!(
            target: "reservoir::audit",
            admin = %admin.id(),
            credit = %credit.id(),
            "registry initialized"
        );
        (registry, admin, credit)
    }

    /// Registers a new vault for `asset`.
    ///
    /// # Errors
    ///
    /// - [`VaultError::Unauthorized`] for a foreign admin capability.
    /// - [`VaultError::VaultAlreadyExists`] if `asset` already has a vault.
    /// - [`VaultError::InvalidConfig`] for a bad config or a zero daily limit.
    pub fn create_vault(
        &mut self,
        cap: &AdminCap,
        asset: AssetId,
        config: VaultConfig,
        max_daily_withdrawal: u64,
        ctx: &TxContext,
    ) -> Result<Uuid, VaultError> {
        cap.verify(&self.admin_cap_id)?;
        if self.directory.contains_key(&asset) {
            return Err(VaultError::VaultAlreadyExists(asset));
        }

        let vault = Vault::new(
            asset.clone(),
            config,
            max_daily_withdrawal,
            self.admin_cap_id,
            self.credit_cap_id,
            ctx,
        )?;
        let id = vault.id();

        tracing::info!(
            target: "reservoir::audit",
            vault = %id,
            asset = %asset,
            max_daily_withdrawal,
            ?config,
            "vault created"
        );
        self.directory.insert(asset, id);
        self.vaults.insert(id, vault);
        Ok(id)
    }

    /// The vault id registered for `asset`.
    pub fn vault_id(&self, asset: &AssetId) -> Result<Uuid, VaultError> {
        self.directory
            .get(asset)
            .copied()
            .ok_or_else(|| VaultError::VaultNotFound(asset.clone()))
    }

    /// Read access to the vault for `asset`.
    pub fn vault(&self, asset: &AssetId) -> Result<&Vault, VaultError> {
        let id = self.vault_id(asset)?;
        let vault = self
            .vaults
            .get(&id)
            .ok_or_else(|| VaultError::VaultNotFound(asset.clone()))?;
        check_identity(asset, id, vault)?;
        Ok(vault)
    }

    /// Write access to the vault for `asset`, after confirming the record
    /// matches its directory entry.
    pub fn vault_mut(&mut self, asset: &AssetId) -> Result<&mut Vault, VaultError> {
        let id = self.vault_id(asset)?;
        let vault = self
            .vaults
            .get_mut(&id)
            .ok_or_else(|| VaultError::VaultNotFound(asset.clone()))?;
        check_identity(asset, id, vault)?;
        Ok(vault)
    }

    /// Registered asset types in sorted order.
    pub fn assets(&self) -> Vec<AssetId> {
        self.directory.keys().cloned().collect()
    }

    /// Vaults in asset order.
    pub fn vaults(&self) -> impl Iterator<Item = &Vault> + '_ {
        self.directory.values().filter_map(|id| self.vaults.get(id))
    }

    pub fn len(&self) -> usize {
        self.directory.len()
    }

    pub fn is_empty(&self) -> bool {
        self.directory.is_empty()
    }

    /// Emergency-pauses every registered vault and exhausts each one's
    /// withdrawal quota for the day. Returns how many vaults were paused.
    ///
    /// The capability is checked against the registry and every vault
    /// before any of them is touched, so either every vault is paused or
    /// none is.
    pub fn global_emergency_pause(
        &mut self,
        cap: &AdminCap,
        ctx: &TxContext,
    ) -> Result<usize, VaultError> {
        cap.verify(&self.admin_cap_id)?;
        for vault in self.vaults.values() {
            vault.verify_admin(cap)?;
        }
        for vault in self.vaults.values_mut() {
            vault.global_emergency_pause(cap, ctx)?;
        }
        tracing::warn!(
            target: "reservoir::audit",
            vaults = self.vaults.len(),
            "global emergency pause across registry"
        );
        Ok(self.vaults.len())
    }
}

fn check_identity(asset: &AssetId, expected: Uuid, vault: &Vault) -> Result<(), VaultError> {
    if vault.id() != expected || vault.asset() != asset {
        tracing::warn!(
            asset = %asset,
            expected = %expected,
            found = %vault.id(),
            "vault record does not match directory"
        );
        return Err(VaultError::IdentityMismatch {
            asset: asset.clone(),
            expected,
            found: vault.id(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vault::VaultStatus;

    fn usdc() -> AssetId {
        AssetId::new("USDC").unwrap()
    }

    fn ctx() -> TxContext {
        TxContext::from_millis(1_700_000_000_000)
    }

    #[test]
    fn create_and_look_up() {
        let (mut registry, admin, _) = VaultRegistry::initialize();
        assert!(registry.is_empty());

        let id = registry
            .create_vault(&admin, usdc(), VaultConfig::default(), 10_000, &ctx())
            .unwrap();
        assert_eq!(registry.vault_id(&usdc()).unwrap(), id);
        assert_eq!(registry.vault(&usdc()).unwrap().id(), id);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.assets(), vec![usdc()]);
    }

    #[test]
    fn duplicate_asset_rejected() {
        let (mut registry, admin, _) = VaultRegistry::initialize();
        registry
            .create_vault(&admin, usdc(), VaultConfig::default(), 10_000, &ctx())
            .unwrap();
        let err = registry
            .create_vault(&admin, usdc(), VaultConfig::default(), 10_000, &ctx())
            .unwrap_err();
        assert!(matches!(err, VaultError::VaultAlreadyExists(_)));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn foreign_admin_cannot_create() {
        let (mut registry, _, _) = VaultRegistry::initialize();
        let (_, other_admin, _) = VaultRegistry::initialize();
        let err = registry
            .create_vault(&other_admin, usdc(), VaultConfig::default(), 10_000, &ctx())
            .unwrap_err();
        assert!(matches!(err, VaultError::Unauthorized));
        assert!(registry.is_empty());
    }

    #[test]
    fn zero_daily_limit_rejected() {
        let (mut registry, admin, _) = VaultRegistry::initialize();
        let err = registry
            .create_vault(&admin, usdc(), VaultConfig::default(), 0, &ctx())
            .unwrap_err();
        assert!(matches!(err, VaultError::InvalidConfig(_)));
    }

    #[test]
    fn missing_asset_is_not_found() {
        let (registry, _, _) = VaultRegistry::initialize();
        assert!(matches!(
            registry.vault(&usdc()),
            Err(VaultError::VaultNotFound(_))
        ));
    }

    #[test]
    fn tampered_directory_fails_identity_check() {
        let (mut registry, admin, _) = VaultRegistry::initialize();
        registry
            .create_vault(&admin, usdc(), VaultConfig::default(), 10_000, &ctx())
            .unwrap();
        let dai_id = registry
            .create_vault(
                &admin,
                AssetId::new("DAI").unwrap(),
                VaultConfig::default(),
                10_000,
                &ctx(),
            )
            .unwrap();

        // Point USDC's directory entry at the DAI record.
        registry.directory.insert(usdc(), dai_id);
        assert!(matches!(
            registry.vault_mut(&usdc()),
            Err(VaultError::IdentityMismatch { .. })
        ));
    }

    #[test]
    fn global_pause_hits_every_vault() {
        let (mut registry, admin, _) = VaultRegistry::initialize();
        for symbol in ["USDC", "DAI", "WETH"] {
            registry
                .create_vault(
                    &admin,
                    AssetId::new(symbol).unwrap(),
                    VaultConfig::default(),
                    10_000,
                    &ctx(),
                )
                .unwrap();
        }
        assert_eq!(registry.global_emergency_pause(&admin, &ctx()).unwrap(), 3);
        for vault in registry.vaults() {
            assert_eq!(vault.status(), VaultStatus::Inactive);
            assert_eq!(vault.remaining_withdrawal_today(&ctx()), 0);
        }
    }

    #[test]
    fn global_pause_is_all_or_nothing_on_foreign_vault() {
        let (mut registry, admin, _) = VaultRegistry::initialize();
        let mut dai_id = Uuid::nil();
        for symbol in ["USDC", "DAI", "WETH"] {
            let id = registry
                .create_vault(
                    &admin,
                    AssetId::new(symbol).unwrap(),
                    VaultConfig::default(),
                    10_000,
                    &ctx(),
                )
                .unwrap();
            if symbol == "DAI" {
                dai_id = id;
            }
        }

        // A restored snapshot where one vault answers to some other admin.
        let mut json = serde_json::to_value(&registry).unwrap();
        json["vaults"][dai_id.to_string()]["admin_cap_id"] =
            serde_json::json!(Uuid::new_v4().to_string());
        let mut registry: VaultRegistry = serde_json::from_value(json).unwrap();

        assert!(matches!(
            registry.global_emergency_pause(&admin, &ctx()),
            Err(VaultError::Unauthorized)
        ));
        for vault in registry.vaults() {
            assert_eq!(vault.status(), VaultStatus::Active);
            assert_eq!(vault.remaining_withdrawal_today(&ctx()), 10_000);
        }
    }

    #[test]
    fn restore_rejects_vault_with_overfull_counter() {
        let (mut registry, admin, _) = VaultRegistry::initialize();
        let id = registry
            .create_vault(&admin, usdc(), VaultConfig::default(), 10_000, &ctx())
            .unwrap();
        let mut json = serde_json::to_value(&registry).unwrap();
        json["vaults"][id.to_string()]["daily_limit"]["withdrawn_today"] =
            serde_json::json!(50_000);
        assert!(serde_json::from_value::<VaultRegistry>(json).is_err());
    }

    #[test]
    fn registry_snapshot_round_trips() {
        let (mut registry, admin, _) = VaultRegistry::initialize();
        registry
            .create_vault(&admin, usdc(), VaultConfig::default(), 10_000, &ctx())
            .unwrap();
        let json = serde_json::to_string(&registry).unwrap();
        let restored: VaultRegistry = serde_json::from_str(&json).unwrap();
        assert_eq!(
            restored.vault_id(&usdc()).unwrap(),
            registry.vault_id(&usdc()).unwrap()
        );
    }
}
