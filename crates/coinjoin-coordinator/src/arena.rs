//! the arena: every live round, the prison and the periodic tick
//!
//! requests address a round by id and are applied under that round's lock.
//! expensive checks (ownership proofs, witnesses) run before the lock is
//! taken; deadlines are evaluated after it is taken.

use std::collections::HashMap;
use std::sync::Arc;

use bitcoin::{Amount, OutPoint, ScriptBuf, Transaction, Witness};
use rand::rngs::OsRng;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::{debug, info, warn};
use wabisabi::{Element, RealCredentialsRequest, ZeroCredentialsRequest};

use crate::alice::AliceId;
use crate::coin::{Coin, OwnershipProof};
use crate::config::ArenaConfig;
use crate::error::{ArenaError, Result};
use crate::external::{OwnershipVerifier, TransactionBroadcaster, WitnessValidator};
use crate::parameters::{RoundId, RoundParameters};
use crate::phase::{ArenaEvent, Phase};
use crate::prison::Prison;
use crate::round::{
    ConnectionConfirmationResponse, InputRegistrationResponse, OutputRegistrationResponse, Round,
    RoundState,
};

/// result of a mutating call together with what it caused
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Applied<T> {
    pub response: T,
    pub events: Vec<ArenaEvent>,
}

pub struct Arena {
    config: ArenaConfig,
    template: RoundParameters,
    rounds: RwLock<HashMap<RoundId, Arc<Mutex<Round>>>>,
    /// live inputs across all rounds
    registered: Mutex<HashMap<OutPoint, RoundId>>,
    prison: Mutex<Prison>,
    ownership: Arc<dyn OwnershipVerifier>,
    witnesses: Arc<dyn WitnessValidator>,
    broadcaster: Arc<dyn TransactionBroadcaster>,
}

impl Arena {
    pub fn new(
        config: ArenaConfig,
        ownership: Arc<dyn OwnershipVerifier>,
        witnesses: Arc<dyn WitnessValidator>,
        broadcaster: Arc<dyn TransactionBroadcaster>,
    ) -> Result<Self> {
        let template = RoundParameters::from_config(&config.round)?;
        Ok(Self {
            config,
            template,
            rounds: RwLock::new(HashMap::new()),
            registered: Mutex::new(HashMap::new()),
            prison: Mutex::new(Prison::new()),
            ownership,
            witnesses,
            broadcaster,
        })
    }

    pub fn config(&self) -> &ArenaConfig {
        &self.config
    }

    /// parameters standard rounds are created with
    pub fn template(&self) -> &RoundParameters {
        &self.template
    }

    pub async fn create_round(&self, parameters: RoundParameters) -> Result<Applied<RoundId>> {
        parameters.validate()?;
        let round = Round::new(
            parameters,
            None,
            Default::default(),
            Instant::now(),
            &mut OsRng,
        )?;
        Ok(self.insert(round).await)
    }

    /// retry of `original` that admits only `banned_inputs`
    pub async fn create_blame_round(
        &self,
        original: RoundId,
        banned_inputs: Vec<OutPoint>,
    ) -> Result<Applied<RoundId>> {
        let parameters = self.round(&original).await?.lock().await.parameters().clone();
        self.spawn_blame_round(original, &parameters, banned_inputs, Instant::now())
            .await
    }

    async fn spawn_blame_round(
        &self,
        original: RoundId,
        parameters: &RoundParameters,
        banned_inputs: Vec<OutPoint>,
        now: Instant,
    ) -> Result<Applied<RoundId>> {
        let parameters =
            parameters.for_blame_round(self.config.blame_input_registration_timeout());
        let round = Round::new(
            parameters,
            Some(original),
            banned_inputs.into_iter().collect(),
            now,
            &mut OsRng,
        )?;
        Ok(self.insert(round).await)
    }

    async fn insert(&self, mut round: Round) -> Applied<RoundId> {
        let id = round.id();
        let events = round.drain_events();
        info!(
            round = %id,
            blame_of = ?round.blame_of(),
            deadline_secs = round.parameters().timeouts.input_registration.as_secs(),
            "round created"
        );
        self.rounds
            .write()
            .await
            .insert(id, Arc::new(Mutex::new(round)));
        Applied {
            response: id,
            events,
        }
    }

    async fn round(&self, id: &RoundId) -> Result<Arc<Mutex<Round>>> {
        self.rounds
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or(ArenaError::RoundNotFound(*id))
    }

    async fn snapshot(&self) -> Vec<Arc<Mutex<Round>>> {
        self.rounds.read().await.values().cloned().collect()
    }

    pub async fn get_round_state(&self, id: &RoundId) -> Result<RoundState> {
        Ok(self.round(id).await?.lock().await.state())
    }

    pub async fn round_states(&self) -> Vec<RoundState> {
        let mut states = Vec::new();
        for round in self.snapshot().await {
            states.push(round.lock().await.state());
        }
        states.sort_by_key(|s| s.id);
        states
    }

    pub async fn is_banned(&self, outpoint: &OutPoint) -> bool {
        self.prison.lock().await.is_banned(outpoint, Instant::now())
    }

    pub async fn register_input(
        &self,
        round_id: RoundId,
        coin: Coin,
        ownership_proof: OwnershipProof,
        zero_amount_request: ZeroCredentialsRequest<Element>,
        zero_vsize_request: ZeroCredentialsRequest<Element>,
    ) -> Result<Applied<InputRegistrationResponse>> {
        let round = self.round(&round_id).await?;
        if !self.ownership.verify(&coin, &ownership_proof, &round_id) {
            return Err(ArenaError::WrongOwnershipProof);
        }

        let outpoint = coin.outpoint;
        self.reserve(outpoint, round_id).await?;

        let result = {
            let mut round = round.lock().await;
            let now = Instant::now();
            let banned = !round.is_blame_round() && self.prison.lock().await.is_banned(&outpoint, now);
            if banned {
                Err(ArenaError::InputBanned(outpoint))
            } else {
                round
                    .register_input(
                        coin,
                        ownership_proof,
                        &zero_amount_request,
                        &zero_vsize_request,
                        now,
                        &mut OsRng,
                    )
                    .map(|response| Applied {
                        response,
                        events: round.drain_events(),
                    })
            }
        };

        match &result {
            Ok(applied) => self.observe(&applied.events).await,
            Err(e) => {
                debug!(round = %round_id, input = %outpoint, error = %e, "input rejected");
                self.release(&outpoint, &round_id).await;
            }
        }
        result
    }

    pub async fn remove_input(&self, round_id: RoundId, alice_id: AliceId) -> Result<Applied<()>> {
        let round = self.round(&round_id).await?;
        let events = {
            let mut round = round.lock().await;
            round.remove_input(&alice_id, Instant::now())?;
            round.drain_events()
        };
        self.observe(&events).await;
        Ok(Applied {
            response: (),
            events,
        })
    }

    pub async fn confirm_connection(
        &self,
        round_id: RoundId,
        alice_id: AliceId,
        amount_request: RealCredentialsRequest<Element>,
        vsize_request: RealCredentialsRequest<Element>,
    ) -> Result<Applied<Option<ConnectionConfirmationResponse>>> {
        let round = self.round(&round_id).await?;
        let applied = {
            let mut round = round.lock().await;
            let response = round.confirm_connection(
                &alice_id,
                &amount_request,
                &vsize_request,
                Instant::now(),
                &mut OsRng,
            )?;
            Applied {
                response,
                events: round.drain_events(),
            }
        };
        self.observe(&applied.events).await;
        Ok(applied)
    }

    pub async fn register_output(
        &self,
        round_id: RoundId,
        script_pubkey: ScriptBuf,
        amount: Amount,
        amount_request: RealCredentialsRequest<Element>,
        vsize_request: RealCredentialsRequest<Element>,
    ) -> Result<Applied<OutputRegistrationResponse>> {
        let round = self.round(&round_id).await?;
        let applied = {
            let mut round = round.lock().await;
            let response = round.register_output(
                script_pubkey,
                amount,
                &amount_request,
                &vsize_request,
                Instant::now(),
                &mut OsRng,
            )?;
            Applied {
                response,
                events: round.drain_events(),
            }
        };
        self.observe(&applied.events).await;
        Ok(applied)
    }

    pub async fn ready_to_sign(&self, round_id: RoundId, alice_id: AliceId) -> Result<Applied<()>> {
        let round = self.round(&round_id).await?;
        let mut round = round.lock().await;
        round.ready_to_sign(&alice_id, Instant::now())?;
        Ok(Applied {
            response: (),
            events: round.drain_events(),
        })
    }

    pub async fn unsigned_transaction(&self, round_id: RoundId) -> Result<Transaction> {
        let round = self.round(&round_id).await?;
        let round = round.lock().await;
        round.unsigned_transaction().cloned()
    }

    /// validate `witness` for the alice's input, then store it
    pub async fn sign_transaction(
        &self,
        round_id: RoundId,
        alice_id: AliceId,
        witness: Witness,
    ) -> Result<Applied<()>> {
        let round = self.round(&round_id).await?;
        let (transaction, prevouts, index) =
            round.lock().await.signing_input(&alice_id, Instant::now())?;

        if !self
            .witnesses
            .validate(&transaction, index, &prevouts, &witness)
        {
            return Err(ArenaError::InvalidWitness);
        }

        let mut round = round.lock().await;
        round.add_witness(&alice_id, witness, Instant::now())?;
        Ok(Applied {
            response: (),
            events: round.drain_events(),
        })
    }

    /// advance every round, punish stallers, spawn blame rounds, broadcast
    /// finished coinjoins and keep one standard round open
    pub async fn tick(&self) -> Vec<ArenaEvent> {
        let now = Instant::now();
        let mut events = Vec::new();

        let released = self.prison.lock().await.release_expired(now);
        if !released.is_empty() {
            debug!(count = released.len(), "bans served");
        }

        let mut punish = Vec::new();
        let mut blames = Vec::new();
        for round in self.snapshot().await {
            let mut round = round.lock().await;
            events.extend(round.tick(now));

            let inputs = round.take_punishable();
            if !inputs.is_empty() {
                punish.push((round.id(), inputs));
            }
            if let Some(banned) = round.take_blame() {
                if !banned.is_empty() {
                    blames.push((round.id(), round.parameters().clone(), banned));
                }
            }
        }

        if !punish.is_empty() {
            let ban = self.config.ban_duration();
            let mut prison = self.prison.lock().await;
            for (round_id, inputs) in punish {
                prison.punish(&inputs, round_id, now, ban);
                warn!(round = %round_id, count = inputs.len(), "inputs banned");
                events.push(ArenaEvent::InputsBanned { round_id, inputs });
            }
        }

        for (original, parameters, banned) in blames {
            match self
                .spawn_blame_round(original, &parameters, banned, now)
                .await
            {
                Ok(applied) => events.extend(applied.events),
                Err(e) => warn!(round = %original, error = %e, "blame round not created"),
            }
        }

        for event in &events {
            if let ArenaEvent::TransactionFinalized {
                round_id,
                transaction,
            } = event
            {
                info!(round = %round_id, txid = %transaction.compute_txid(), "broadcasting coinjoin");
                self.broadcaster.broadcast(transaction);
            }
        }

        self.observe(&events).await;
        self.retire_ended(now).await;

        match self.ensure_open_round(now).await {
            Ok(Some(applied)) => events.extend(applied.events),
            Ok(None) => {}
            Err(e) => warn!(error = %e, "standard round not created"),
        }
        events
    }

    /// claim `outpoint` for `round_id` unless another round holds it
    async fn reserve(&self, outpoint: OutPoint, round_id: RoundId) -> Result<()> {
        let mut registered = self.registered.lock().await;
        if registered.contains_key(&outpoint) {
            return Err(ArenaError::InputAlreadyRegistered(outpoint));
        }
        registered.insert(outpoint, round_id);
        Ok(())
    }

    async fn release(&self, outpoint: &OutPoint, round_id: &RoundId) {
        let mut registered = self.registered.lock().await;
        if registered.get(outpoint) == Some(round_id) {
            registered.remove(outpoint);
        }
    }

    /// keep the input index in step with drops and ended rounds
    async fn observe(&self, events: &[ArenaEvent]) {
        for event in events {
            match event {
                ArenaEvent::InputsDropped { round_id, inputs } => {
                    for input in inputs {
                        self.release(input, round_id).await;
                    }
                }
                ArenaEvent::RoundEnded { round_id, .. } => {
                    self.registered
                        .lock()
                        .await
                        .retain(|_, owner| owner != round_id);
                }
                _ => {}
            }
        }
    }

    async fn retire_ended(&self, now: Instant) {
        let retention = self.config.ended_round_retention();
        let mut expired = Vec::new();
        for round in self.snapshot().await {
            let round = round.lock().await;
            if let Some(ended_at) = round.ended_at() {
                if ended_at + retention <= now {
                    expired.push(round.id());
                }
            }
        }
        if expired.is_empty() {
            return;
        }

        let mut rounds = self.rounds.write().await;
        for id in &expired {
            rounds.remove(id);
        }
        debug!(count = expired.len(), "ended rounds discarded");
    }

    async fn ensure_open_round(&self, now: Instant) -> Result<Option<Applied<RoundId>>> {
        for round in self.snapshot().await {
            let round = round.lock().await;
            if !round.is_blame_round() && round.phase() == Phase::InputRegistration {
                return Ok(None);
            }
        }
        let round = Round::new(self.template.clone(), None, Default::default(), now, &mut OsRng)?;
        Ok(Some(self.insert(round).await))
    }
}

impl core::fmt::Debug for Arena {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Arena")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
