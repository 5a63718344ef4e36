//! Command-line entry point for the curve library: curve diagnostics,
//! point order, generic discrete-log solving, and a local two-party
//! Diffie-Hellman handshake demo. Dispatches by `clap` derive subcommand,
//! with `indicatif` spinners around the long-running cardinality/generator
//! searches.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ecgroup::curve::{self, Curve};
use ecgroup::dlog;
use ecgroup::keyagreement::Session;
use ecgroup::point::Point;
use indicatif::ProgressBar;

#[derive(Parser)]
#[command(name = "eckey", about = "Elliptic-curve group arithmetic and EC Diffie-Hellman")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the curve's textual form and its group cardinality.
    Cardinality(CurveArgs),
    /// Print the order of a point on the curve.
    Order {
        #[command(flatten)]
        curve: CurveArgs,
        #[arg(long, allow_hyphen_values = true)]
        x: String,
        #[arg(long, allow_hyphen_values = true)]
        y: String,
    },
    /// Solve a discrete log `target = k * base` on the curve.
    Dlog {
        #[command(flatten)]
        curve: CurveArgs,
        #[arg(long, allow_hyphen_values = true)]
        base_x: String,
        #[arg(long, allow_hyphen_values = true)]
        base_y: String,
        #[arg(long, allow_hyphen_values = true)]
        target_x: String,
        #[arg(long, allow_hyphen_values = true)]
        target_y: String,
        /// "shanks" or "pohlig-hellman"
        #[arg(long, default_value = "pohlig-hellman")]
        method: String,
    },
    /// Run a local two-party key-agreement handshake and print whether
    /// both sides landed on the same session key.
    Handshake(CurveArgs),
}

#[derive(clap::Args)]
struct CurveArgs {
    #[arg(long, allow_hyphen_values = true)]
    a: String,
    #[arg(long, allow_hyphen_values = true)]
    b: String,
    #[arg(long, allow_hyphen_values = true)]
    c: String,
    #[arg(long, allow_hyphen_values = true)]
    p: String,
}

impl CurveArgs {
    fn build(&self) -> Result<std::sync::Arc<Curve>> {
        let a = curve::parse_decimal(&self.a).context("parsing a")?;
        let b = curve::parse_decimal(&self.b).context("parsing b")?;
        let c = curve::parse_decimal(&self.c).context("parsing c")?;
        let p = curve::parse_decimal(&self.p).context("parsing p")?;
        Ok(Curve::new(a, b, c, p)?)
    }
}

fn parse_point(curve: &std::sync::Arc<Curve>, x: &str, y: &str) -> Result<Point> {
    let x = curve::parse_decimal(x)?;
    let y = curve::parse_decimal(y)?;
    Ok(Point::affine(curve, x, y)?)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Cardinality(args) => {
            let curve = args.build()?;
            println!("{curve}");

            let spinner = ProgressBar::new_spinner();
            spinner.set_message("sampling points to pin down #C...");
            let n = curve.cardinality()?;
            spinner.finish_with_message(format!("#C = {n}"));
        }
        Command::Order { curve, x, y } => {
            let curve = curve.build()?;
            let point = parse_point(&curve, &x, &y)?;

            let spinner = ProgressBar::new_spinner();
            spinner.set_message("computing order...");
            let order = ecgroup::order::compute_order(&curve, &point)?;
            spinner.finish_with_message(format!("ord(P) = {order}"));
        }
        Command::Dlog {
            curve,
            base_x,
            base_y,
            target_x,
            target_y,
            method,
        } => {
            let curve = curve.build()?;
            let base = parse_point(&curve, &base_x, &base_y)?;
            let target = parse_point(&curve, &target_x, &target_y)?;

            let spinner = ProgressBar::new_spinner();
            spinner.set_message(format!("solving via {method}..."));
            let x = match method.as_str() {
                "shanks" => {
                    let n = curve.cardinality()?;
                    dlog::shanks(&base, &target, &n)?
                }
                "pohlig-hellman" => {
                    let order = ecgroup::order::compute_order(&curve, &base)?;
                    dlog::pohlig_hellman(&base, &target, &order)?
                }
                other => anyhow::bail!("unknown method: {other} (expected shanks or pohlig-hellman)"),
            };
            spinner.finish_with_message(format!("k = {x}"));
        }
        Command::Handshake(args) => {
            let curve = args.build()?;
            let mut rng = rand::thread_rng();

            let spinner = ProgressBar::new_spinner();
            spinner.set_message("picking a generator...");
            let generator = curve.pick_generator(&mut rng)?;
            spinner.finish_with_message("generator found");

            let mut alice = Session::new(curve.clone(), generator.clone());
            let mut bob = Session::new(curve.clone(), generator);

            let alice_params = alice.generate_params(&mut rng)?;
            let bob_params = bob.generate_params(&mut rng)?;
            alice.await_peer()?;
            bob.await_peer()?;

            let alice_peer = Point::decode(&curve, &bob_params.public_point)?;
            let bob_peer = Point::decode(&curve, &alice_params.public_point)?;
            alice.derive_shared_key(&alice_peer)?;
            bob.derive_shared_key(&bob_peer)?;

            let alice_tag = alice.confirmation_tag()?;
            let bob_tag = bob.confirmation_tag()?;
            alice.confirm(&bob_tag)?;
            bob.confirm(&alice_tag)?;

            println!(
                "session keys match: {}",
                alice.session_key() == bob.session_key()
            );
            if let Some(key) = alice.session_key() {
                println!("session key: {}", hex::encode(key));
            }
        }
    }

    Ok(())
}

