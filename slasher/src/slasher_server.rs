use crate::{Error, Slasher, SlashingStatus};
use ssz_derive::{Decode, Encode};
use std::sync::Arc;
use types::{
    AttesterSlashing, EthSpec, IndexedAttestation, ProposerSlashing, SignedBeaconBlockHeader,
};

#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct AttesterSlashingResponse<E: EthSpec> {
    pub attester_slashing: Vec<AttesterSlashing<E>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct ProposerSlashingRequest {
    pub block_header: SignedBeaconBlockHeader,
    pub validator_index: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct ProposerSlashingResponse {
    pub proposer_slashing: Vec<ProposerSlashing>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode)]
pub struct SlashingStatusRequest {
    pub status: SlashingStatus,
}

/// Request handlers for the slasher's query service.
#[derive(Debug)]
pub struct SlasherServer<E: EthSpec> {
    slasher: Arc<Slasher<E>>,
}

impl<E: EthSpec> Clone for SlasherServer<E> {
    fn clone(&self) -> Self {
        Self {
            slasher: self.slasher.clone(),
        }
    }
}

impl<E: EthSpec> SlasherServer<E> {
    pub fn new(slasher: Arc<Slasher<E>>) -> Self {
        Self { slasher }
    }

    pub fn slasher(&self) -> &Arc<Slasher<E>> {
        &self.slasher
    }

    pub fn is_slashable_attestation(
        &self,
        attestation: &IndexedAttestation<E>,
    ) -> Result<AttesterSlashingResponse<E>, Error> {
        let attester_slashing = self.slasher.is_slashable_attestation(attestation)?;
        Ok(AttesterSlashingResponse { attester_slashing })
    }

    pub fn is_slashable_block(
        &self,
        request: &ProposerSlashingRequest,
    ) -> Result<ProposerSlashingResponse, Error> {
        let proposer_slashing = self
            .slasher
            .is_slashable_block(&request.block_header, request.validator_index)?
            .into_iter()
            .collect();
        Ok(ProposerSlashingResponse { proposer_slashing })
    }

    pub fn proposer_slashings(&self, request: &SlashingStatusRequest) -> ProposerSlashingResponse {
        ProposerSlashingResponse {
            proposer_slashing: self.slasher.proposer_slashings(request.status),
        }
    }

    pub fn attester_slashings(
        &self,
        request: &SlashingStatusRequest,
    ) -> AttesterSlashingResponse<E> {
        AttesterSlashingResponse {
            attester_slashing: self.slasher.attester_slashings(request.status),
        }
    }
}
