//! Native extension registrar.
//!
//! A native-coin pair is served either by legacy minter/burner bytecode or by an
//! [`Erc20Extension`] installed at the same address. This module moves pairs to the latter and
//! keeps the host's active-extension list sorted and duplicate-free.

use alloy_primitives::Address;
use erc20_precompiles::Erc20Extension;
use erc20_primitives::{Erc20Event, TokenPair};
use tracing::instrument;

use crate::{error::Erc20Error, expected_keepers::Ledger, keeper::Keeper};

impl<L: Ledger> Keeper<L> {
    /// Registers `denom` as a MODULE pair served by a native extension at its deterministic
    /// address.
    #[instrument(skip(self), fields(address = tracing::field::Empty))]
    pub fn register_extension(&mut self, denom: &str) -> Result<TokenPair, Erc20Error> {
        if self.is_denom_registered(denom) {
            return Err(Erc20Error::AlreadyExists(format!("coin denomination already registered: {denom}")));
        }
        let pair = TokenPair::native_extension(denom);
        let address = pair.erc20_address;
        tracing::Span::current().record("address", tracing::field::debug(address));

        let mut active = self.ledger.active_extensions();
        if active.contains(address) {
            return Err(Erc20Error::AlreadyRegistered(address));
        }

        self.with_checkpoint(|keeper| {
            let pair = keeper.register_token_pair(pair)?;
            let extension = keeper.build_extension(&pair)?;
            keeper.ledger.install_extension(extension)?;
            active.insert(address).map_err(|_| Erc20Error::AlreadyRegistered(address))?;
            keeper.ledger.enable_extensions(active)?;

            tracing::info!(target: "erc20::extensions", %denom, ?address, "extension registered");
            keeper.emit(Erc20Event::RegisterExtension { denom: pair.denom.clone(), erc20_address: address });
            Ok(pair)
        })
    }

    /// Installs an extension for every MODULE pair that is not active yet and returns the newly
    /// activated addresses in registry order.
    ///
    /// Removing the legacy bytecode is best-effort. Building or installing an extension is not.
    #[instrument(skip(self), fields(installed = tracing::field::Empty))]
    pub fn install_extensions_for_all_pairs(&mut self) -> Result<Vec<Address>, Erc20Error> {
        let pairs = self.token_pairs().collect::<Result<Vec<_>, _>>()?;
        let mut active = self.ledger.active_extensions();
        let mut installed = Vec::new();

        for pair in pairs {
            let address = pair.erc20_address;
            if !pair.is_native_coin() || active.contains(address) {
                continue;
            }

            let extension = self.build_extension(&pair)?;
            if let Err(err) = self.ledger.delete_account(address) {
                tracing::warn!(
                    target: "erc20::extensions",
                    ?address,
                    denom = %pair.denom,
                    %err,
                    "failed to remove legacy contract"
                );
            }
            self.ledger.install_extension(extension)?;
            active.insert(address).map_err(|_| Erc20Error::AlreadyRegistered(address))?;
            installed.push(address);
        }

        let total = active.len();
        if !installed.is_empty() {
            self.ledger.enable_extensions(active)?;
        }
        tracing::Span::current().record("installed", installed.len());
        tracing::info!(target: "erc20::extensions", count = installed.len(), total, "extensions installed");
        Ok(installed)
    }

    /// Builds the extension for `pair` from the bank metadata of its denom.
    fn build_extension(&self, pair: &TokenPair) -> Result<Erc20Extension, Erc20Error> {
        let Some(metadata) = self.ledger.denom_metadata(&pair.denom) else {
            return Ok(Erc20Extension::new(pair, pair.denom.clone(), pair.denom.clone(), 0));
        };
        let decimals = u8::try_from(metadata.display_exponent())
            .map_err(|_| Erc20Error::Overflow("display exponent"))?;
        Ok(Erc20Extension::new(pair, metadata.name, metadata.symbol, decimals))
    }
}
