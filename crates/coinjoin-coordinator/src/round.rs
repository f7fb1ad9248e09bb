//! one coinjoin round: phases, registrations and credential accounting
//!
//! a round owns its two credential issuers, its alices and bobs and the
//! coinjoin under construction. phase changes happen in [`Round::tick`];
//! every mutating call re-checks phase and deadline at the moment it applies.

use std::collections::HashSet;
use std::time::Duration;

use bitcoin::{Amount, OutPoint, ScriptBuf, Transaction, TxOut, Witness};
use tokio::time::Instant;
use tracing::{debug, info, warn};
use wabisabi::{
    CredentialError, CredentialIssuer, CredentialIssuerParameters, CredentialIssuerSecretKey,
    CredentialsResponse, Element, RealCredentialsRequest, VerifiedRequest, ZeroCredentialsRequest,
};

use crate::alice::{Alice, AliceId};
use crate::bob::Bob;
use crate::coin::{Coin, OwnershipProof, ScriptType};
use crate::coinjoin::CoinjoinState;
use crate::error::{ArenaError, Result};
use crate::parameters::{sorted_outpoints, RoundId, RoundParameters};
use crate::phase::{ArenaEvent, EndRoundState, Phase};

/// issued to a freshly registered alice
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InputRegistrationResponse {
    pub alice_id: AliceId,
    pub amount_credentials: CredentialsResponse<Element>,
    pub vsize_credentials: CredentialsResponse<Element>,
}

/// real credentials for a confirmed alice
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectionConfirmationResponse {
    pub amount_credentials: CredentialsResponse<Element>,
    pub vsize_credentials: CredentialsResponse<Element>,
}

/// change credentials left after paying for an output
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputRegistrationResponse {
    pub amount_credentials: CredentialsResponse<Element>,
    pub vsize_credentials: CredentialsResponse<Element>,
}

/// read-only projection of a round for monitoring and clients
#[derive(Clone, Debug)]
pub struct RoundState {
    pub id: RoundId,
    pub phase: Phase,
    pub end_state: Option<EndRoundState>,
    pub input_count: usize,
    pub confirmed_count: usize,
    pub output_count: usize,
    pub parameters: RoundParameters,
    pub phase_deadline: Instant,
    pub is_blame_round: bool,
    pub blame_of: Option<RoundId>,
    pub banned_inputs: Vec<OutPoint>,
    pub amount_issuer: CredentialIssuerParameters<Element>,
    pub vsize_issuer: CredentialIssuerParameters<Element>,
}

pub struct Round {
    id: RoundId,
    parameters: RoundParameters,
    phase: Phase,
    end_state: Option<EndRoundState>,
    blame_of: Option<RoundId>,
    /// inputs a blame round admits; empty for standard rounds
    banned_inputs: HashSet<OutPoint>,
    amount_issuer: CredentialIssuer<Element>,
    vsize_issuer: CredentialIssuer<Element>,
    alices: Vec<Alice>,
    bobs: Vec<Bob>,
    coinjoin: Option<CoinjoinState>,
    phase_started: Instant,
    phase_deadline: Instant,
    confirmation_restarts: u32,
    /// every input dropped for not confirming, across restarts
    unresponsive: Vec<OutPoint>,
    /// dropped inputs the arena has not punished yet
    punishable: Vec<OutPoint>,
    /// inputs a blame round should name, once the round failed
    blame: Option<Vec<OutPoint>>,
    ended_at: Option<Instant>,
    events: Vec<ArenaEvent>,
}

impl Round {
    pub fn new<R: rand_core::RngCore + rand_core::CryptoRng>(
        parameters: RoundParameters,
        blame_of: Option<RoundId>,
        banned_inputs: HashSet<OutPoint>,
        now: Instant,
        rng: &mut R,
    ) -> Result<Self> {
        let mut salt = [0u8; 32];
        rng.fill_bytes(&mut salt);
        let id = parameters.round_id(&salt, blame_of.as_ref());

        let amount_issuer = CredentialIssuer::new(
            CredentialIssuerSecretKey::random(rng),
            &id.amount_context(),
            parameters.max_amount_credential_value(),
        )?;
        let vsize_issuer = CredentialIssuer::new(
            CredentialIssuerSecretKey::random(rng),
            &id.vsize_context(),
            parameters.max_vsize_credential_value(),
        )?;

        let phase_deadline = now + parameters.timeouts.input_registration;
        Ok(Self {
            id,
            parameters,
            phase: Phase::InputRegistration,
            end_state: None,
            blame_of,
            banned_inputs,
            amount_issuer,
            vsize_issuer,
            alices: Vec::new(),
            bobs: Vec::new(),
            coinjoin: None,
            phase_started: now,
            phase_deadline,
            confirmation_restarts: 0,
            unresponsive: Vec::new(),
            punishable: Vec::new(),
            blame: None,
            ended_at: None,
            events: vec![ArenaEvent::RoundCreated {
                round_id: id,
                blame_of,
            }],
        })
    }

    pub fn id(&self) -> RoundId {
        self.id
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn end_state(&self) -> Option<EndRoundState> {
        self.end_state
    }

    pub fn parameters(&self) -> &RoundParameters {
        &self.parameters
    }

    pub fn is_blame_round(&self) -> bool {
        self.blame_of.is_some()
    }

    pub fn blame_of(&self) -> Option<RoundId> {
        self.blame_of
    }

    pub fn phase_started(&self) -> Instant {
        self.phase_started
    }

    pub fn phase_deadline(&self) -> Instant {
        self.phase_deadline
    }

    pub fn ended_at(&self) -> Option<Instant> {
        self.ended_at
    }

    pub fn alices(&self) -> &[Alice] {
        &self.alices
    }

    pub fn bobs(&self) -> &[Bob] {
        &self.bobs
    }

    pub fn inputs(&self) -> impl Iterator<Item = OutPoint> + '_ {
        self.alices.iter().map(Alice::outpoint)
    }

    pub fn amount_issuer(&self) -> &CredentialIssuer<Element> {
        &self.amount_issuer
    }

    pub fn vsize_issuer(&self) -> &CredentialIssuer<Element> {
        &self.vsize_issuer
    }

    pub fn coinjoin(&self) -> Option<&CoinjoinState> {
        self.coinjoin.as_ref()
    }

    pub fn state(&self) -> RoundState {
        RoundState {
            id: self.id,
            phase: self.phase,
            end_state: self.end_state,
            input_count: self.alices.len(),
            confirmed_count: self.alices.iter().filter(|a| a.confirmed).count(),
            output_count: self.bobs.len(),
            parameters: self.parameters.clone(),
            phase_deadline: self.phase_deadline,
            is_blame_round: self.is_blame_round(),
            blame_of: self.blame_of,
            banned_inputs: sorted_outpoints(&self.banned_inputs),
            amount_issuer: *self.amount_issuer.parameters(),
            vsize_issuer: *self.vsize_issuer.parameters(),
        }
    }

    /// events produced since the last call
    pub fn drain_events(&mut self) -> Vec<ArenaEvent> {
        std::mem::take(&mut self.events)
    }

    /// inputs dropped for stalling the round, not yet handed to the prison
    pub fn take_punishable(&mut self) -> Vec<OutPoint> {
        std::mem::take(&mut self.punishable)
    }

    /// inputs to name in a blame round, once, after a failed round
    pub fn take_blame(&mut self) -> Option<Vec<OutPoint>> {
        self.blame.take()
    }

    /// whether a blame round admits `outpoint`; standard rounds admit all
    pub fn admits(&self, outpoint: &OutPoint) -> bool {
        !self.is_blame_round() || self.banned_inputs.contains(outpoint)
    }

    fn require_phase(&self, expected: Phase, now: Instant) -> Result<()> {
        if self.phase == Phase::Ended {
            return Err(ArenaError::RoundEnded);
        }
        if self.phase != expected {
            return Err(ArenaError::WrongPhase {
                expected,
                actual: self.phase,
            });
        }
        if now >= self.phase_deadline {
            return Err(ArenaError::DeadlinePassed);
        }
        Ok(())
    }

    fn alice_index(&self, alice_id: &AliceId) -> Result<usize> {
        self.alices
            .iter()
            .position(|a| a.id == *alice_id)
            .ok_or(ArenaError::AliceNotFound(*alice_id))
    }

    /// register a coin whose ownership proof the caller has already checked
    pub fn register_input<R: rand_core::RngCore + rand_core::CryptoRng>(
        &mut self,
        coin: Coin,
        ownership_proof: OwnershipProof,
        zero_amount_request: &ZeroCredentialsRequest<Element>,
        zero_vsize_request: &ZeroCredentialsRequest<Element>,
        now: Instant,
        rng: &mut R,
    ) -> Result<InputRegistrationResponse> {
        self.require_phase(Phase::InputRegistration, now)?;

        let outpoint = coin.outpoint;
        if !self.admits(&outpoint) {
            return Err(ArenaError::InputNotAdmitted(outpoint));
        }
        if self.alices.iter().any(|a| a.outpoint() == outpoint) {
            return Err(ArenaError::InputAlreadyRegistered(outpoint));
        }
        if self.alices.len() >= self.parameters.max_input_count {
            return Err(ArenaError::RoundFull);
        }
        let script_type = coin.script_type().ok_or(ArenaError::ScriptNotAllowed)?;
        if !self.parameters.allowed_input_amounts.contains(coin.amount()) {
            return Err(ArenaError::InputAmountOutOfRange(coin.amount().to_sat()));
        }
        if self.parameters.effective_value(&coin, script_type) <= 0 {
            return Err(ArenaError::UneconomicalInput(outpoint));
        }

        let amount_credentials = self
            .amount_issuer
            .request_zero_credentials(zero_amount_request, rng)?;
        let vsize_credentials = self
            .vsize_issuer
            .request_zero_credentials(zero_vsize_request, rng)?;

        let alice_id = AliceId::random(rng);
        self.alices.push(Alice {
            id: alice_id,
            coin,
            script_type,
            ownership_proof,
            registered_at: now,
            deadline: now + self.parameters.timeouts.connection_confirmation,
            confirmed: false,
            ready_to_sign: false,
            amount_credential_value: 0,
            vsize_credential_value: 0,
        });
        info!(
            round = %self.id,
            input = %outpoint,
            alices = self.alices.len(),
            "input registered"
        );

        Ok(InputRegistrationResponse {
            alice_id,
            amount_credentials,
            vsize_credentials,
        })
    }

    /// withdraw an alice while inputs are still being registered
    pub fn remove_input(&mut self, alice_id: &AliceId, now: Instant) -> Result<()> {
        self.require_phase(Phase::InputRegistration, now)?;
        let index = self.alice_index(alice_id)?;
        if self.alices[index].confirmed {
            return Err(ArenaError::AliceAlreadyConfirmed);
        }
        let alice = self.alices.remove(index);
        info!(round = %self.id, input = %alice.outpoint(), "input unregistered");
        self.events.push(ArenaEvent::InputsDropped {
            round_id: self.id,
            inputs: vec![alice.outpoint()],
        });
        Ok(())
    }

    /// keep-alive during input registration, real credentials afterwards
    ///
    /// during input registration this only extends the alice's deadline and
    /// returns `None`. during connection confirmation the requests must carry
    /// exactly the effective input value and the remaining vsize budget.
    pub fn confirm_connection<R: rand_core::RngCore + rand_core::CryptoRng>(
        &mut self,
        alice_id: &AliceId,
        amount_request: &RealCredentialsRequest<Element>,
        vsize_request: &RealCredentialsRequest<Element>,
        now: Instant,
        rng: &mut R,
    ) -> Result<Option<ConnectionConfirmationResponse>> {
        if self.phase == Phase::InputRegistration {
            self.require_phase(Phase::InputRegistration, now)?;
            let index = self.alice_index(alice_id)?;
            let alice = &mut self.alices[index];
            if !alice.confirmed {
                alice.deadline = now + self.parameters.timeouts.connection_confirmation;
            }
            return Ok(None);
        }

        self.require_phase(Phase::ConnectionConfirmation, now)?;
        let index = self.alice_index(alice_id)?;
        let alice = &self.alices[index];
        if alice.confirmed {
            return Err(ArenaError::AliceAlreadyConfirmed);
        }

        let amount_value = self.parameters.effective_value(&alice.coin, alice.script_type);
        let vsize_value = self.parameters.vsize_credential_value(alice.script_type);
        check_delta(amount_value, amount_request)?;
        check_delta(vsize_value, vsize_request)?;

        let (amount_credentials, vsize_credentials) =
            self.redeem(amount_request, vsize_request, now, rng)?;

        let alice = &mut self.alices[index];
        alice.confirmed = true;
        alice.amount_credential_value = amount_value;
        alice.vsize_credential_value = vsize_value;
        debug!(round = %self.id, input = %alice.outpoint(), "connection confirmed");

        Ok(Some(ConnectionConfirmationResponse {
            amount_credentials,
            vsize_credentials,
        }))
    }

    /// register an output paid for with amount and vsize credentials
    pub fn register_output<R: rand_core::RngCore + rand_core::CryptoRng>(
        &mut self,
        script_pubkey: ScriptBuf,
        amount: Amount,
        amount_request: &RealCredentialsRequest<Element>,
        vsize_request: &RealCredentialsRequest<Element>,
        now: Instant,
        rng: &mut R,
    ) -> Result<OutputRegistrationResponse> {
        self.require_phase(Phase::OutputRegistration, now)?;

        let script_type = ScriptType::from_script(&script_pubkey).ok_or(ArenaError::ScriptNotAllowed)?;
        if amount < script_pubkey.minimal_non_dust() {
            return Err(ArenaError::DustOutput(amount.to_sat()));
        }
        if !self.parameters.allowed_output_amounts.contains(amount) {
            return Err(ArenaError::OutputAmountOutOfRange(amount.to_sat()));
        }
        if self.bobs.iter().any(|b| b.script_pubkey == script_pubkey) {
            return Err(ArenaError::ScriptAlreadyRegistered);
        }

        let cost = self
            .parameters
            .output_cost(amount, script_type)
            .ok_or(ArenaError::OutputAmountOutOfRange(amount.to_sat()))?;
        check_delta(-cost, amount_request)?;
        check_delta(-(script_type.output_vsize() as i64), vsize_request)?;

        let mut redeemed = amount_request.serial_numbers();
        redeemed.extend(vsize_request.serial_numbers());

        let (amount_credentials, vsize_credentials) =
            self.redeem_checked(amount_request, vsize_request, now, rng, |round| {
                round.registered_cost() + cost <= round.confirmed_value()
            })?;

        self.bobs.push(Bob {
            script_pubkey,
            script_type,
            amount,
            redeemed,
        });
        info!(
            round = %self.id,
            amount = amount.to_sat(),
            outputs = self.bobs.len(),
            "output registered"
        );

        Ok(OutputRegistrationResponse {
            amount_credentials,
            vsize_credentials,
        })
    }

    /// alice has registered all her outputs
    pub fn ready_to_sign(&mut self, alice_id: &AliceId, now: Instant) -> Result<()> {
        self.require_phase(Phase::OutputRegistration, now)?;
        let index = self.alice_index(alice_id)?;
        let alice = &mut self.alices[index];
        if !alice.confirmed {
            return Err(ArenaError::AliceNotConfirmed);
        }
        alice.ready_to_sign = true;
        Ok(())
    }

    /// what an alice's witness must commit to: transaction, prevouts, index
    pub fn signing_input(
        &self,
        alice_id: &AliceId,
        now: Instant,
    ) -> Result<(Transaction, Vec<TxOut>, usize)> {
        self.require_phase(Phase::TransactionSigning, now)?;
        let index = self.input_index_of(alice_id)?;
        let coinjoin = self.coinjoin.as_ref().ok_or(ArenaError::InvariantViolation(self.id))?;
        if coinjoin.is_signed(index) {
            return Err(ArenaError::AliceAlreadySigned);
        }
        Ok((
            coinjoin.unsigned_transaction().clone(),
            coinjoin.prevouts().to_vec(),
            index,
        ))
    }

    /// store an already validated witness
    pub fn add_witness(&mut self, alice_id: &AliceId, witness: Witness, now: Instant) -> Result<()> {
        self.require_phase(Phase::TransactionSigning, now)?;
        let index = self.input_index_of(alice_id)?;
        let id = self.id;
        let coinjoin = self.coinjoin.as_mut().ok_or(ArenaError::InvariantViolation(id))?;
        if coinjoin.is_signed(index) {
            return Err(ArenaError::AliceAlreadySigned);
        }
        coinjoin.add_witness(index, witness);
        debug!(round = %id, input = index, "witness added");
        Ok(())
    }

    pub fn unsigned_transaction(&self) -> Result<&Transaction> {
        if self.phase != Phase::TransactionSigning {
            return Err(ArenaError::WrongPhase {
                expected: Phase::TransactionSigning,
                actual: self.phase,
            });
        }
        self.coinjoin
            .as_ref()
            .map(CoinjoinState::unsigned_transaction)
            .ok_or(ArenaError::InvariantViolation(self.id))
    }

    fn input_index_of(&self, alice_id: &AliceId) -> Result<usize> {
        let outpoint = self.alices[self.alice_index(alice_id)?].outpoint();
        self.coinjoin
            .as_ref()
            .and_then(|c| c.input_index(&outpoint))
            .ok_or(ArenaError::InvariantViolation(self.id))
    }

    fn confirmed_value(&self) -> i64 {
        self.alices
            .iter()
            .filter(|a| a.confirmed)
            .map(|a| a.amount_credential_value)
            .sum()
    }

    fn registered_cost(&self) -> i64 {
        self.bobs
            .iter()
            .filter_map(|b| self.parameters.output_cost(b.amount, b.script_type))
            .sum()
    }

    fn redeem<R: rand_core::RngCore + rand_core::CryptoRng>(
        &mut self,
        amount_request: &RealCredentialsRequest<Element>,
        vsize_request: &RealCredentialsRequest<Element>,
        now: Instant,
        rng: &mut R,
    ) -> Result<(CredentialsResponse<Element>, CredentialsResponse<Element>)> {
        self.redeem_checked(amount_request, vsize_request, now, rng, |_| true)
    }

    /// verify both requests, run `consistent` against round bookkeeping, then
    /// commit both issuers
    ///
    /// nothing changes if a request is rejected. an issuer or bookkeeping
    /// inconsistency ends the round.
    fn redeem_checked<R, F>(
        &mut self,
        amount_request: &RealCredentialsRequest<Element>,
        vsize_request: &RealCredentialsRequest<Element>,
        now: Instant,
        rng: &mut R,
        consistent: F,
    ) -> Result<(CredentialsResponse<Element>, CredentialsResponse<Element>)>
    where
        R: rand_core::RngCore + rand_core::CryptoRng,
        F: FnOnce(&Self) -> bool,
    {
        let verified = self
            .amount_issuer
            .verify_real_request(amount_request)
            .and_then(|a| Ok((a, self.vsize_issuer.verify_real_request(vsize_request)?)));
        let (amount, vsize): (VerifiedRequest<'_, Element>, VerifiedRequest<'_, Element>) =
            match verified {
                Ok(v) => v,
                Err(e @ CredentialError::InvariantViolation { .. }) => {
                    return Err(self.violate_invariant(&e.to_string(), now))
                }
                Err(e) => return Err(e.into()),
            };

        if !consistent(&*self) {
            return Err(self.violate_invariant("outputs exceed confirmed inputs", now));
        }

        let committed = self
            .amount_issuer
            .issue_verified(amount, rng)
            .and_then(|a| Ok((a, self.vsize_issuer.issue_verified(vsize, rng)?)));
        committed.map_err(|e| self.violate_invariant(&e.to_string(), now))
    }

    fn violate_invariant(&mut self, reason: &str, now: Instant) -> ArenaError {
        warn!(round = %self.id, reason, "invariant violation, ending round");
        self.end(EndRoundState::InvariantViolation, now);
        ArenaError::InvariantViolation(self.id)
    }

    /// evaluate deadlines and advance as far as the round can go right now
    pub fn tick(&mut self, now: Instant) -> Vec<ArenaEvent> {
        while self.step(now) {}
        self.drain_events()
    }

    /// one transition; `true` if the phase changed
    fn step(&mut self, now: Instant) -> bool {
        match self.phase {
            Phase::InputRegistration => self.step_input_registration(now),
            Phase::ConnectionConfirmation => self.step_connection_confirmation(now),
            Phase::OutputRegistration => self.step_output_registration(now),
            Phase::TransactionSigning => self.step_transaction_signing(now),
            Phase::Ended => false,
        }
    }

    fn step_input_registration(&mut self, now: Instant) -> bool {
        let lapsed: Vec<OutPoint> = self
            .alices
            .iter()
            .filter(|a| !a.confirmed && a.deadline <= now)
            .map(Alice::outpoint)
            .collect();
        if !lapsed.is_empty() {
            self.alices.retain(|a| a.confirmed || a.deadline > now);
            debug!(round = %self.id, dropped = lapsed.len(), "keep-alive lapsed");
            self.events.push(ArenaEvent::InputsDropped {
                round_id: self.id,
                inputs: sorted_outpoints(&lapsed),
            });
        }

        let count = self.alices.len();
        let enough = count >= self.parameters.min_input_count;
        let full = count >= self.parameters.max_input_count;
        let blame_complete = self.is_blame_round() && count == self.banned_inputs.len();

        if full || (enough && (blame_complete || now >= self.phase_deadline)) {
            let timeout = self.parameters.timeouts.connection_confirmation;
            self.set_phase(Phase::ConnectionConfirmation, now, timeout);
            true
        } else if now >= self.phase_deadline {
            // a restarted round still owes a blame round for its non-confirmers
            if !self.unresponsive.is_empty() {
                self.blame = Some(sorted_outpoints(&self.unresponsive));
            }
            self.end(EndRoundState::NotEnoughInputs, now);
            true
        } else {
            false
        }
    }

    fn step_connection_confirmation(&mut self, now: Instant) -> bool {
        if self.alices.iter().all(|a| a.confirmed) {
            let timeout = self.parameters.timeouts.output_registration;
            self.set_phase(Phase::OutputRegistration, now, timeout);
            return true;
        }
        if now < self.phase_deadline {
            return false;
        }

        let dropped: Vec<OutPoint> = self
            .alices
            .iter()
            .filter(|a| !a.confirmed)
            .map(Alice::outpoint)
            .collect();
        self.alices.retain(|a| a.confirmed);
        let dropped = sorted_outpoints(&dropped);
        warn!(
            round = %self.id,
            dropped = dropped.len(),
            remaining = self.alices.len(),
            "alices failed to confirm"
        );
        self.events.push(ArenaEvent::InputsDropped {
            round_id: self.id,
            inputs: dropped.clone(),
        });
        self.unresponsive.extend(&dropped);
        self.punishable.extend(&dropped);

        if self.alices.len() > 1 && self.confirmation_restarts < self.parameters.max_confirmation_restarts {
            self.confirmation_restarts += 1;
            let timeout = self.parameters.timeouts.input_registration;
            self.set_phase(Phase::InputRegistration, now, timeout);
        } else {
            self.blame = Some(sorted_outpoints(&self.unresponsive));
            self.end(EndRoundState::NotAllAlicesConfirmed, now);
        }
        true
    }

    fn step_output_registration(&mut self, now: Instant) -> bool {
        let all_ready = self.alices.iter().all(|a| a.ready_to_sign);
        if !all_ready && now < self.phase_deadline {
            return false;
        }

        match CoinjoinState::construct(&self.parameters, &self.alices, &self.bobs) {
            Ok(coinjoin) => {
                info!(
                    round = %self.id,
                    inputs = coinjoin.unsigned_transaction().input.len(),
                    outputs = coinjoin.unsigned_transaction().output.len(),
                    fee = coinjoin.fee().to_sat(),
                    vsize = coinjoin.estimated_vsize(),
                    "coinjoin assembled"
                );
                self.coinjoin = Some(coinjoin);
                let timeout = self.parameters.timeouts.transaction_signing;
                self.set_phase(Phase::TransactionSigning, now, timeout);
            }
            Err(end_state) => self.end(end_state, now),
        }
        true
    }

    fn step_transaction_signing(&mut self, now: Instant) -> bool {
        let Some(coinjoin) = self.coinjoin.as_ref() else {
            self.end(EndRoundState::InvariantViolation, now);
            return true;
        };

        if coinjoin.is_fully_signed() {
            let transaction = coinjoin.signed_transaction();
            info!(round = %self.id, txid = %transaction.compute_txid(), "coinjoin fully signed");
            self.events.push(ArenaEvent::TransactionFinalized {
                round_id: self.id,
                transaction,
            });
            self.end(EndRoundState::Succeeded, now);
            return true;
        }
        if now < self.phase_deadline {
            return false;
        }

        let unsigned = coinjoin.unsigned_inputs();
        warn!(round = %self.id, unsigned = unsigned.len(), "alices failed to sign");
        self.punishable.extend(&unsigned);
        self.blame = Some(sorted_outpoints(&unsigned));
        self.end(EndRoundState::NotAllAlicesSigned, now);
        true
    }

    fn set_phase(&mut self, to: Phase, now: Instant, timeout: Duration) {
        let from = self.phase;
        self.phase = to;
        self.phase_started = now;
        self.phase_deadline = now + timeout;
        info!(round = %self.id, %from, %to, "phase changed");
        self.events.push(ArenaEvent::PhaseChanged {
            round_id: self.id,
            from,
            to,
        });
    }

    fn end(&mut self, end_state: EndRoundState, now: Instant) {
        if self.phase == Phase::Ended {
            return;
        }
        self.set_phase(Phase::Ended, now, Duration::ZERO);
        self.end_state = Some(end_state);
        self.ended_at = Some(now);
        info!(round = %self.id, %end_state, "round ended");
        self.events.push(ArenaEvent::RoundEnded {
            round_id: self.id,
            end_state,
        });
    }
}

impl core::fmt::Debug for Round {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Round")
            .field("id", &self.id)
            .field("phase", &self.phase)
            .field("end_state", &self.end_state)
            .field("blame_of", &self.blame_of)
            .field("alices", &self.alices.len())
            .field("bobs", &self.bobs.len())
            .finish_non_exhaustive()
    }
}

fn check_delta(expected: i64, request: &RealCredentialsRequest<Element>) -> Result<()> {
    if request.delta != expected {
        return Err(ArenaError::IncorrectRequestedDelta {
            expected,
            got: request.delta,
        });
    }
    Ok(())
}
