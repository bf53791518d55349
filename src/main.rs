use anyhow::{Context, Result};
use std::path::Path;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use recipe_rag::assistant::{ChatSession, InstructionCache, OpenRouterGenerator, TextGenerator};
use recipe_rag::cli::{parse_args, Cli, Command, EmbedderKind};
use recipe_rag::recipe::{display_title, Diet, Recipe};
use recipe_rag::search::{Embedder, EmbeddingEngine, HashingEmbedder};
use recipe_rag::{Engine, RecipeHit};

const API_KEY_ENV_VAR: &str = "OPENROUTER_API_KEY";

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = parse_args();
    match cli.embedder {
        EmbedderKind::Model2vec => {
            let embedder = EmbeddingEngine::new().context("Failed to load the embedding model")?;
            run(&cli, embedder).await
        }
        EmbedderKind::Hashing => run(&cli, HashingEmbedder::default()).await,
    }
}

async fn run<E: Embedder>(cli: &Cli, embedder: E) -> Result<()> {
    let engine = Engine::load(
        &cli.recipes,
        &cli.ingredients,
        embedder,
        cli.metric,
        cli.index_cache.as_deref(),
    )?;
    let generator = OpenRouterGenerator::new(API_KEY_ENV_VAR, &cli.model, Duration::from_secs(cli.timeout_secs));

    match &cli.command {
        Command::Ingredients => {
            for name in engine.catalog().canonical_names() {
                println!("{}", name);
            }
            Ok(())
        }
        Command::Find { have, diet, max_kcal, instructions } => {
            let generator = instructions.then_some(&generator);
            find(&engine, generator, have, *diet, *max_kcal).await
        }
        Command::Chat => chat(&engine, &generator).await,
        Command::Index { out } => save_index(&engine, out),
    }
}

fn save_index<E: Embedder>(engine: &Engine<E>, out: &Path) -> Result<()> {
    engine.index().save(out)?;
    println!("Saved index of {} recipes to {}", engine.index().len(), out.display());
    Ok(())
}

async fn print_recipe<G: TextGenerator>(
    recipe: &Recipe,
    kcal: i64,
    missing: &[String],
    generator: Option<&G>,
    cache: &mut InstructionCache,
) {
    let title = display_title(&recipe.title);
    let ingredients = recipe.ingredients.as_flat_text();
    println!("- {} [{}] ({} kcal)", title, recipe.category, kcal);
    println!("    Składniki: {}", ingredients);
    if !missing.is_empty() {
        println!("    Brakuje: {}", missing.join(", "));
    }
    if let Some(generator) = generator {
        match cache.get_or_generate(generator, title, &ingredients).await {
            Ok(text) => {
                for line in text.lines() {
                    println!("    {}", line);
                }
            }
            Err(e) => warn!(recipe = title, error = %e, "Could not generate instructions"),
        }
    }
}

async fn print_hits<G: TextGenerator>(
    heading: &str,
    hits: &[RecipeHit<'_>],
    generator: Option<&G>,
    cache: &mut InstructionCache,
) {
    println!("\n{}", heading);
    if hits.is_empty() {
        println!("  (brak)");
    }
    for hit in hits {
        print_recipe(hit.recipe, hit.kcal, &hit.missing, generator, cache).await;
    }
}

async fn find<E: Embedder, G: TextGenerator>(
    engine: &Engine<E>,
    generator: Option<&G>,
    have: &[String],
    diet: Diet,
    max_kcal: Option<i64>,
) -> Result<()> {
    let mut cache = InstructionCache::default();
    let report = engine.find(have, diet, max_kcal);

    print_hits("Pełne dopasowania:", &report.full, generator, &mut cache).await;
    print_hits("Częściowe dopasowania (brakuje 1-2 składników):", &report.partial, generator, &mut cache).await;

    println!("\nSugestie AI:");
    let suggestions = engine.suggest(have).unwrap_or_else(|e| {
        warn!(error = %e, "Could not compute suggestions for this pantry");
        Vec::new()
    });
    if suggestions.is_empty() {
        println!("  (brak)");
    }
    for retrieved in suggestions {
        let recipe = retrieved.recipe;
        print_recipe(recipe, engine.calories(recipe), &[], generator, &mut cache).await;
    }
    Ok(())
}

async fn chat<E: Embedder, G: TextGenerator>(engine: &Engine<E>, generator: &G) -> Result<()> {
    let mut session = ChatSession::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    println!("Napisz do asystenta (pusta linia lub 'exit' kończy rozmowę).");
    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let message = line.trim();
        if message.is_empty() || message.eq_ignore_ascii_case("exit") {
            break;
        }

        match session.respond(engine.index(), generator, message).await {
            Ok(reply) => println!("{}\n", reply),
            Err(e) => eprintln!("Błąd asystenta: {:#}", e),
        }
    }
    Ok(())
}
