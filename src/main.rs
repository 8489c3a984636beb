use clap::Parser;
use ui_bundle::domain::model::{BuildPlan, BuildReport};
use ui_bundle::utils::error::ErrorSeverity;
use ui_bundle::utils::{logger, validation::Validate};
use ui_bundle::{Action, AssetWatcher, BundleConfig, BundleEngine, BundleError, CliArgs, LocalStorage};

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();

    // 初始化日誌
    if args.json_logs {
        logger::init_json_logger(args.verbose);
    } else {
        logger::init_cli_logger(args.verbose);
    }

    tracing::info!("Starting ui-bundle");
    if args.verbose {
        tracing::debug!("CLI args: {:?}", args);
    }

    if let Err(e) = run(&args).await {
        tracing::error!(
            "❌ {} failed: {} (Category: {:?}, Severity: {:?})",
            action_name(&args.action()),
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 {}", e.recovery_suggestion());

        // 根據錯誤嚴重程度決定退出碼
        let exit_code = match e.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        };

        if exit_code > 0 {
            std::process::exit(exit_code);
        }
    }
}

async fn run(args: &CliArgs) -> Result<(), BundleError> {
    // 載入配置
    let mut config = BundleConfig::load(args.config.as_deref())?;

    // 應用命令列覆蓋設定
    if let Some(root) = &args.root {
        config.project.root = root.clone();
        tracing::info!("🔧 Project root overridden to: {}", root);
    }

    config.validate()?;
    tracing::debug!("Configuration loaded: {} ({} tasks)", config.project.name, config.tasks.len());

    let storage = LocalStorage::new(config.root());
    let engine = BundleEngine::new(storage, config)?;

    match args.action() {
        Action::Clean => {
            engine.clean().await?;
            println!("🧹 Removed {}", engine.config().output.build_dir);
        }
        Action::Build | Action::Bundle => {
            let report = engine.build().await?;
            display_build_report(&report);
        }
        Action::Task { name } => {
            let report = engine.run_task(&name).await?;
            println!(
                "✅ {}: {} files -> {}",
                report.task,
                report.files_copied,
                engine.config().output.staging_dir
            );
        }
        Action::Watch { initial_build } => {
            if initial_build {
                let report = engine.build().await?;
                display_build_report(&report);
            }
            let root = engine.config().root();
            let watcher = AssetWatcher::new(engine, root)?;
            println!("👀 Watching for changes (Ctrl-C to stop)");
            let rebuilds = watcher.run().await?;
            println!("👋 Stopped after {} rebuilds", rebuilds);
        }
        Action::Plan { json } => {
            let plan = engine.plan().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&plan)?);
            } else {
                display_plan(&plan);
            }
        }
    }

    Ok(())
}

fn action_name(action: &Action) -> &'static str {
    match action {
        Action::Clean => "clean",
        Action::Build => "build",
        Action::Bundle => "bundle",
        Action::Task { .. } => "task",
        Action::Watch { .. } => "watch",
        Action::Plan { .. } => "plan",
    }
}

fn display_build_report(report: &BuildReport) {
    println!("✅ Build completed in {:?}", report.duration);
    for task in &report.tasks {
        println!("  {:<10} {:>4} files", task.task, task.files_copied);
    }
    println!(
        "📦 {} ({} files, {} bytes)",
        report.archive.path, report.archive.files, report.archive.bytes
    );
}

fn display_plan(plan: &BuildPlan) {
    println!("🔍 Build Plan:");
    println!("  Clean:   {}", plan.clean);
    println!("  Staging: {}", plan.staging_dir);
    println!("  Archive: {}", plan.archive);
    println!();

    for task in &plan.tasks {
        let status = if task.would_fail { "  ⚠️ no matches" } else { "" };
        println!(
            "⚙️ {} [{}] {} ({} files){}",
            task.task,
            task.transform.name(),
            task.pattern,
            task.files.len(),
            status
        );
        for file in &task.files {
            println!("    {} -> {}", file.source, file.target);
        }
    }

    println!();
    println!("✅ Dry run complete. Nothing was written.");
}
