//! ETHDKG Simulator CLI
//!
//! Drives the ETHDKG engine, the staking ledger and the lockup against
//! in-memory collaborators and writes a JSON transcript of everything that
//! happened:
//! - DKG rounds, with silent and misbehaving validators
//! - Staking positions sharing fee deposits
//! - A full lockup lifecycle

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use ethdkg_core::{
    threshold, Address, Call, ClaimKind, DkgConfig, DleqProof, Ethdkg, Event, G1Point, G2Point,
    Height, KeyShare, MemoryValidatorPool, ScriptedVerifier, ValidatorPool,
};
use primitive_types::U256;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use staking_ledger::{
    Asset, BalanceLedger, Lockup, LockupConfig, MemoryBalances, Payout, PositionEvent,
    PublicStaking, ReserveReport,
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn, Level};

type Engine = Ethdkg<MemoryValidatorPool, ScriptedVerifier>;

/// ETHDKG Sim - local protocol simulator
#[derive(Parser)]
#[command(name = "ethdkg-sim")]
#[command(about = "Simulate ETHDKG rounds, staking positions and lockups")]
#[command(version)]
struct Cli {
    /// Directory transcripts are written to
    #[arg(short, long, env = "DEST", default_value = "./data")]
    dest: PathBuf,

    /// Engine configuration (JSON); defaults apply to missing fields
    #[arg(short, long, env = "ETHDKG_CONFIG")]
    config: Option<PathBuf>,

    /// Seed for addresses and key material
    #[arg(short, long, env = "SIM_SEED", default_value_t = 1)]
    seed: u64,

    /// Height the simulation starts at
    #[arg(long, default_value_t = 1)]
    height: Height,

    /// Log as JSON lines
    #[arg(long, env = "LOG_JSON")]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run DKG rounds until one completes
    Round {
        /// Number of validators
        #[arg(short, long, default_value_t = 4)]
        validators: usize,

        /// Validators that never distribute shares; they are accused and the
        /// round is restarted without them
        #[arg(long, default_value_t = 0)]
        silent: usize,

        /// Validators whose distributed shares fail verification
        #[arg(long, default_value_t = 0)]
        bad_shares: usize,

        /// Validators whose GPKj fails verification
        #[arg(long, default_value_t = 0)]
        bad_gpkj: usize,
    },

    /// Stake positions, share fee deposits and burn everything
    Stake {
        #[arg(long, default_value_t = 3)]
        stakers: usize,

        /// Number of fee deposits in each asset
        #[arg(long, default_value_t = 5)]
        deposits: usize,
    },

    /// Lock positions, earn fees and unlock with the reward pool
    Lockup {
        #[arg(long, default_value_t = 3)]
        users: usize,

        #[arg(long, default_value_t = 10)]
        enrollment: u64,

        #[arg(long, default_value_t = 100)]
        duration: u64,

        /// Tokens the reward pool stakes as the bonus position
        #[arg(long, default_value_t = 10_000)]
        bonus: u64,

        /// One user leaves early with half of their shares
        #[arg(long)]
        early_exit: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into());
    if cli.json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_max_level(Level::INFO)
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_max_level(Level::INFO)
            .with_env_filter(filter)
            .init();
    }

    // Ensure output directory exists
    std::fs::create_dir_all(&cli.dest)?;
    let mut rng = ChaCha8Rng::seed_from_u64(cli.seed);

    match &cli.command {
        Commands::Round {
            validators,
            silent,
            bad_shares,
            bad_gpkj,
        } => {
            run_round(&cli, &mut rng, *validators, *silent, *bad_shares, *bad_gpkj)?;
        }
        Commands::Stake { stakers, deposits } => {
            run_stake(&cli, &mut rng, *stakers, *deposits)?;
        }
        Commands::Lockup {
            users,
            enrollment,
            duration,
            bonus,
            early_exit,
        } => {
            run_lockup(&cli, &mut rng, *users, *enrollment, *duration, *bonus, *early_exit)?;
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<DkgConfig> {
    let Some(path) = path else {
        return Ok(DkgConfig::default());
    };
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let config: DkgConfig = serde_json::from_str(&json)?;
    config.validate()?;
    Ok(config)
}

fn write_transcript(cli: &Cli, name: &str, transcript: &impl Serialize) -> Result<PathBuf> {
    let path = cli.dest.join(name);
    let json = serde_json::to_string_pretty(transcript)?;
    std::fs::write(&path, json)?;
    Ok(path)
}

fn random_address(rng: &mut ChaCha8Rng) -> Address {
    Address::from(rng.gen::<[u8; 20]>())
}

/// Random non-zero field element
fn random_u256(rng: &mut ChaCha8Rng) -> U256 {
    let value = U256::from_big_endian(&rng.gen::<[u8; 32]>());
    if value.is_zero() {
        U256::one()
    } else {
        value
    }
}

fn random_g1(rng: &mut ChaCha8Rng) -> G1Point {
    G1Point::new(random_u256(rng), random_u256(rng))
}

fn random_g2(rng: &mut ChaCha8Rng) -> G2Point {
    G2Point::new([
        random_u256(rng),
        random_u256(rng),
        random_u256(rng),
        random_u256(rng),
    ])
}

#[derive(Debug, Serialize)]
struct RoundRecord {
    round: u64,
    nonce: u64,
    completed: bool,
    events: Vec<Event>,
}

#[derive(Serialize)]
struct RoundTranscript {
    config: DkgConfig,
    validators: Vec<Address>,
    rounds: Vec<RoundRecord>,
    slashes: Vec<ethdkg_core::Slash>,
    outcomes: Vec<ethdkg_core::RoundOutcome>,
}

fn run_round(
    cli: &Cli,
    rng: &mut ChaCha8Rng,
    n_validators: usize,
    silent: usize,
    bad_shares: usize,
    bad_gpkj: usize,
) -> Result<()> {
    if silent + bad_shares + bad_gpkj >= n_validators {
        bail!("At least one validator must behave");
    }
    let config = load_config(cli.config.as_deref())?;
    let validators: Vec<Address> = (0..n_validators).map(|_| random_address(rng)).collect();

    info!(
        validators = n_validators,
        silent,
        bad_shares,
        bad_gpkj,
        phase_length = config.phase_length,
        "Starting simulation"
    );

    let pool = MemoryValidatorPool::with_validators(validators.iter().copied());
    let verifier = ScriptedVerifier::new();
    let mut engine: Engine = Ethdkg::new(config.clone(), pool.clone(), verifier.clone())?;

    // misbehaviour is assigned from the back of the set
    let mut roles = validators.iter().rev().copied();
    let mut silent: Vec<Address> = roles.by_ref().take(silent).collect();
    let bad_share_senders: Vec<Address> = roles.by_ref().take(bad_shares).collect();
    let bad_gpkj_senders: Vec<Address> = roles.take(bad_gpkj).collect();
    for address in &bad_share_senders {
        verifier.reject_for(ClaimKind::DistributedShare, *address);
    }
    for address in &bad_gpkj_senders {
        verifier.reject_for(ClaimKind::Gpkj, *address);
    }

    let mut records = Vec::new();
    let mut height = cli.height;
    loop {
        let (record, next) = drive_round(
            &mut engine,
            rng,
            height,
            &silent,
            &bad_share_senders,
            &bad_gpkj_senders,
        )?;
        let completed = record.completed;
        records.push(record);
        if completed {
            break;
        }

        warn!(accused = silent.len(), "Round stalled, restarting without accused validators");
        for address in silent.drain(..) {
            pool.remove_validator(&address);
        }
        height = next;
    }

    let transcript = RoundTranscript {
        config,
        validators,
        rounds: records,
        slashes: pool.slashes(),
        outcomes: pool.outcomes(),
    };
    let path = write_transcript(cli, "round.json", &transcript)?;

    if let Some(outcome) = transcript.outcomes.last() {
        info!(
            round = outcome.round,
            members = outcome.members.len(),
            bad_participants = outcome.bad_participants,
            path = ?path,
            "DKG completed, transcript saved"
        );
        println!("Round: {}", outcome.round);
        println!("Members: {}", outcome.members.len());
        println!("Slashes: {}", transcript.slashes.len());
    }

    Ok(())
}

/// Drive one round from registration to completion. A round with silent
/// validators stops after they are accused; the returned height is where
/// the next round can open.
fn drive_round(
    engine: &mut Engine,
    rng: &mut ChaCha8Rng,
    height: Height,
    silent: &[Address],
    bad_share_senders: &[Address],
    bad_gpkj_senders: &[Address],
) -> Result<(RoundRecord, Height)> {
    let members = engine.pool().validator_addresses();
    let honest: Vec<Address> = members
        .iter()
        .filter(|a| !silent.contains(a) && !bad_share_senders.contains(a) && !bad_gpkj_senders.contains(a))
        .copied()
        .collect();
    let accuser = *honest.first().context("no honest validator left")?;

    let mut round = engine.initialize(height)?;
    for v in &members {
        engine.register(&mut round, Call::new(*v, height), random_g1(rng))?;
    }

    let n = round.ledger().registered_count();
    let mut distributed = BTreeMap::new();
    let mut height = round.schedule().start();
    for v in members.iter().filter(|v| !silent.contains(v)) {
        let shares: Vec<U256> = (0..n - 1).map(|_| random_u256(rng)).collect();
        let commitments: Vec<G1Point> = (0..threshold(n) + 1).map(|_| random_g1(rng)).collect();
        engine.distribute_shares(
            &mut round,
            Call::new(*v, height),
            shares.clone(),
            commitments.clone(),
        )?;
        distributed.insert(*v, (shares, commitments));
    }

    if !silent.is_empty() {
        height = round.schedule().start() + round.schedule().length();
        engine.accuse_participant_did_not_distribute_shares(
            &mut round,
            Call::new(accuser, height),
            silent,
        )?;
        let record = RoundRecord {
            round: round.number(),
            nonce: round.nonce(),
            completed: false,
            events: round.drain_events(),
        };
        return Ok((record, height + 1));
    }

    // bad-share dispute window
    height = round.schedule().start();
    for dishonest in bad_share_senders {
        let (shares, commitments) = distributed
            .get(dishonest)
            .context("accused validator never distributed shares")?;
        engine.accuse_participant_distributed_bad_shares(
            &mut round,
            Call::new(accuser, height),
            *dishonest,
            shares,
            commitments,
            random_g1(rng),
            DleqProof::new(random_u256(rng), random_u256(rng)),
        )?;
    }

    // key shares open once the dispute window has passed
    let eligible: Vec<Address> = round.ledger().eligible().map(|p| p.address).collect();
    height = round.schedule().start() + round.schedule().length();
    for v in &eligible {
        let key_share = KeyShare {
            g1: random_g1(rng),
            g1_proof: DleqProof::new(random_u256(rng), random_u256(rng)),
            g2: random_g2(rng),
        };
        engine.submit_key_share(&mut round, Call::new(*v, height), key_share)?;
    }

    height = round.schedule().start();
    engine.submit_master_public_key(&mut round, Call::new(accuser, height), random_g2(rng))?;

    height = round.schedule().start();
    for v in &eligible {
        engine.submit_gpkj(&mut round, Call::new(*v, height), random_g2(rng))?;
    }

    height = round.schedule().start();
    for accused in bad_gpkj_senders {
        engine.accuse_participant_submitted_bad_gpkj(
            &mut round,
            Call::new(accuser, height),
            *accused,
            &hex::encode(accused.as_bytes()).into_bytes(),
        )?;
    }

    height = round.schedule().start() + round.schedule().length();
    engine.complete(&mut round, Call::new(accuser, height))?;

    let record = RoundRecord {
        round: round.number(),
        nonce: round.nonce(),
        completed: true,
        events: round.drain_events(),
    };
    Ok((record, height + 1))
}

#[derive(Serialize)]
struct StakeTranscript {
    positions: BTreeMap<u64, Address>,
    payouts: BTreeMap<u64, Payout>,
    events: Vec<PositionEvent>,
    reserves: ReserveReport,
}

fn run_stake(cli: &Cli, rng: &mut ChaCha8Rng, stakers: usize, deposits: usize) -> Result<()> {
    let balances = MemoryBalances::new();
    let mut staking = PublicStaking::new(random_address(rng), balances.clone());
    let depositor = random_address(rng);
    balances.credit(Asset::Token, depositor, U256::from(u64::MAX));
    balances.credit(Asset::Eth, depositor, U256::from(u64::MAX));

    info!(stakers, deposits, "Starting staking simulation");

    let mut height = cli.height;
    let mut positions = BTreeMap::new();
    for _ in 0..stakers {
        let staker = random_address(rng);
        let amount = U256::from(rng.gen_range(1_000u64..=100_000));
        balances.credit(Asset::Token, staker, amount);
        let token_id = staking.mint(Call::new(staker, height), amount)?;
        positions.insert(token_id, staker);
    }

    for _ in 0..deposits {
        height += 1;
        let call = Call::new(depositor, height);
        staking.deposit_token(call, U256::from(rng.gen_range(1u64..=10_000)))?;
        staking.deposit_eth(call, U256::from(rng.gen_range(1u64..=10_000)))?;
    }

    height += 1;
    let mut payouts = BTreeMap::new();
    for (token_id, staker) in &positions {
        let payout = staking.burn(Call::new(*staker, height), *token_id)?;
        payouts.insert(*token_id, payout);
    }

    let transcript = StakeTranscript {
        positions,
        payouts,
        events: staking.drain_events(),
        reserves: staking.reserve_report(),
    };
    let path = write_transcript(cli, "stake.json", &transcript)?;
    info!(
        undistributed_eth = %transcript.reserves.reserve_eth,
        undistributed_token = %transcript.reserves.reserve_token,
        path = ?path,
        "Staking simulation finished, transcript saved"
    );

    Ok(())
}

#[derive(Serialize)]
struct LockupTranscript {
    lockup: Lockup,
    unlocked: BTreeMap<Address, Payout>,
    early_exit: Option<(Address, Payout)>,
    events: Vec<PositionEvent>,
    reserves: ReserveReport,
}

fn run_lockup(
    cli: &Cli,
    rng: &mut ChaCha8Rng,
    users: usize,
    enrollment: u64,
    duration: u64,
    bonus: u64,
    early_exit: bool,
) -> Result<()> {
    if enrollment == 0 {
        bail!("Enrollment period must leave room to lock positions");
    }
    let balances = MemoryBalances::new();
    let mut staking = PublicStaking::new(random_address(rng), balances.clone());
    let reward_pool = random_address(rng);
    let depositor = random_address(rng);
    balances.credit(Asset::Token, reward_pool, U256::from(bonus));
    balances.credit(Asset::Token, depositor, U256::from(u64::MAX));
    balances.credit(Asset::Eth, depositor, U256::from(u64::MAX));

    let config = LockupConfig::new(enrollment, duration, U256::from(bonus))?;
    let mut lockup = Lockup::new(random_address(rng), reward_pool, config, cli.height)?;
    let mut height = cli.height;

    info!(users, start = lockup.start(), end = lockup.end(), "Starting lockup simulation");

    if bonus > 0 {
        lockup.create_bonus_position(Call::new(reward_pool, height), &mut staking)?;
    }

    let mut owners = Vec::new();
    for _ in 0..users {
        let user = random_address(rng);
        let amount = U256::from(rng.gen_range(1_000u64..=100_000));
        balances.credit(Asset::Token, user, amount);
        let call = Call::new(user, height);
        let token_id = staking.mint(call, amount)?;
        staking.approve(call, lockup.address(), token_id)?;
        lockup.lock_from_approval(call, &mut staking, token_id)?;
        owners.push(user);
    }

    // fees arrive while the lock runs
    height = lockup.start();
    while height < lockup.end() {
        let call = Call::new(depositor, height);
        staking.deposit_token(call, U256::from(rng.gen_range(1u64..=1_000)))?;
        staking.deposit_eth(call, U256::from(rng.gen_range(1u64..=1_000)))?;
        height += (duration / 4).max(1);
    }

    let mut exit = None;
    if early_exit {
        if let Some(user) = owners.pop() {
            let call = Call::new(user, lockup.end() - 1);
            let token_id = lockup.token_of(&user).context("locked user has no position")?;
            let shares = staking.position(token_id)?.shares;
            let payout = lockup.unlock_early(call, &mut staking, shares / 2, false)?;
            exit = Some((user, payout));
            owners.push(user);
        }
    }

    height = lockup.end();
    lockup.aggregate_profits(Call::new(depositor, height), &mut staking)?;

    let mut unlocked = BTreeMap::new();
    for user in owners {
        let payout = lockup.unlock(Call::new(user, height), &mut staking, user, false)?;
        unlocked.insert(user, payout);
    }

    let leftover = balances.balance_of(Asset::Token, &lockup.reward_pool().address);
    let transcript = LockupTranscript {
        lockup,
        unlocked,
        early_exit: exit,
        events: staking.drain_events(),
        reserves: staking.reserve_report(),
    };
    let path = write_transcript(cli, "lockup.json", &transcript)?;
    info!(
        unlocked = transcript.unlocked.len(),
        reward_pool_dust = %leftover,
        path = ?path,
        "Lockup simulation finished, transcript saved"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accusing_unknown_sender_is_an_error() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let validators: Vec<Address> = (0..4).map(|_| random_address(&mut rng)).collect();
        let pool = MemoryValidatorPool::with_validators(validators.iter().copied());
        let mut engine: Engine = Ethdkg::new(DkgConfig::default(), pool, ScriptedVerifier::new()).unwrap();

        // never part of the validator set, so it never distributed shares
        let outsider = random_address(&mut rng);
        let err = drive_round(&mut engine, &mut rng, 1, &[], &[outsider], &[]).unwrap_err();
        assert!(err.to_string().contains("never distributed shares"));
    }
}
