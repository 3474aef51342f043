//! Local transaction signing
//!
//! Wraps a `PrivateKeySigner` and produces RLP-encoded legacy transactions
//! (explicit gas price + gas limit, which is what the gas controller tunes).

use alloy::consensus::{SignableTransaction, TxEnvelope, TxLegacy};
use alloy::eips::eip2718::Encodable2718;
use alloy::network::TxSignerSync;
use alloy::primitives::{Address, B256, Bytes, TxKind, U256};
use alloy::signers::local::PrivateKeySigner;
use anyhow::{Context, Result};

/// A signed transaction ready for `eth_sendRawTransaction`
#[derive(Debug, Clone)]
pub struct SignedTx {
    pub hash: B256,
    pub raw: Vec<u8>,
}

/// Signing identity of the keeper
pub struct KeeperSigner {
    signer: PrivateKeySigner,
    address: Address,
    chain_id: u64,
}

impl KeeperSigner {
    pub fn from_hex(private_key: &str, chain_id: u64) -> Result<Self> {
        let trimmed = private_key.trim().trim_start_matches("0x");
        let signer: PrivateKeySigner = trimmed
            .parse()
            .context("invalid keeper private key")?;
        let address = signer.address();
        Ok(Self {
            signer,
            address,
            chain_id,
        })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Build and sign a legacy call transaction with the given gas plan
    pub fn sign_call(
        &self,
        nonce: u64,
        gas_limit: u64,
        gas_price: u128,
        to: Address,
        input: Bytes,
    ) -> Result<SignedTx> {
        let mut tx = TxLegacy {
            chain_id: Some(self.chain_id),
            nonce,
            gas_price,
            gas_limit,
            to: TxKind::Call(to),
            value: U256::ZERO,
            input,
        };

        let signature = self
            .signer
            .sign_transaction_sync(&mut tx)
            .context("transaction signing failed")?;
        let signed = tx.into_signed(signature);
        let hash = *signed.hash();
        let envelope = TxEnvelope::from(signed);

        Ok(SignedTx {
            hash,
            raw: envelope.encoded_2718(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // well-known anvil dev key #0
    const DEV_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const DEV_ADDRESS: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";

    #[test]
    fn test_address_derivation() {
        let signer = KeeperSigner::from_hex(DEV_KEY, 31337).expect("key parses");
        assert_eq!(format!("{:#x}", signer.address()), DEV_ADDRESS);

        let prefixed = KeeperSigner::from_hex(&format!("0x{DEV_KEY}"), 31337).expect("0x ok");
        assert_eq!(prefixed.address(), signer.address());
    }

    #[test]
    fn test_rejects_garbage_key() {
        assert!(KeeperSigner::from_hex("not-a-key", 1).is_err());
    }

    #[test]
    fn test_sign_call_produces_raw_bytes() {
        let signer = KeeperSigner::from_hex(DEV_KEY, 31337).expect("key parses");
        let signed = signer
            .sign_call(
                0,
                800_000,
                24_000_000_000,
                Address::repeat_byte(0x42),
                Bytes::from(vec![0xde, 0xad, 0xbe, 0xef]),
            )
            .expect("signing succeeds");
        assert!(!signed.raw.is_empty());
        assert_ne!(signed.hash, B256::ZERO);
    }
}
