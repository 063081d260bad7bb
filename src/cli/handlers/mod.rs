use crate::cli::commands::*;
use crate::cli::output::*;
use crate::engine::{Engine, MoveOutcome, MoveRequest};
use crate::model::{ClientConfig, NewTask, ProjectId, TaskId, TaskPatch, TaskTree};
use crate::remote::{HttpApi, TodoApi};

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub async fn dispatch(cli: Cli, config: &ClientConfig) -> Result<(), Box<dyn std::error::Error>> {
    let api = HttpApi::new(&config.server)?;
    let engine = Engine::new(api, config.sync.stale_responses);
    run(&engine, cli.command, cli.json).await
}

/// Run one command against an engine.
pub async fn run<A: TodoApi>(
    engine: &Engine<A>,
    command: Commands,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Projects => cmd_projects(engine, json).await,
        Commands::Tree(args) => cmd_tree(engine, args, json).await,
        Commands::Targets(args) => cmd_targets(engine, args, json).await,

        Commands::Add(args) => cmd_add(engine, args, json).await,
        Commands::Edit(args) => {
            let patch = TaskPatch {
                title: args.title,
                description: args.description,
                priority: args.priority,
                ..Default::default()
            };
            if patch.is_empty() {
                return Err("nothing to change (use --title, --description or --priority)".into());
            }
            cmd_update(engine, args.project, args.id, patch, json).await
        }
        Commands::Done(r) => cmd_update(engine, r.project, r.id, TaskPatch::completed(true), json).await,
        Commands::Undone(r) => cmd_update(engine, r.project, r.id, TaskPatch::completed(false), json).await,
        Commands::Fold(r) => cmd_update(engine, r.project, r.id, TaskPatch::collapsed(true), json).await,
        Commands::Unfold(r) => cmd_update(engine, r.project, r.id, TaskPatch::collapsed(false), json).await,
        Commands::Rm(r) => {
            let tree = engine.delete(r.project, r.id).await?;
            print_tree(&tree, false, json)
        }
        Commands::Mv(args) => cmd_mv(engine, args, json).await,
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn print_tree(tree: &TaskTree, show_all: bool, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        println!("{}", serde_json::to_string_pretty(tree)?);
    } else {
        for line in format_tree(tree, show_all) {
            println!("{}", line);
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Read commands
// ---------------------------------------------------------------------------

async fn cmd_projects<A: TodoApi>(engine: &Engine<A>, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let projects = engine.projects().await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&projects)?);
        return Ok(());
    }
    if projects.is_empty() {
        println!("No projects.");
        return Ok(());
    }
    for project in &projects {
        println!("{}", format_project_line(project));
    }
    Ok(())
}

async fn cmd_tree<A: TodoApi>(
    engine: &Engine<A>,
    args: TreeArgs,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let tree = engine.open(args.project).await?;
    print_tree(&tree, args.all, json)
}

async fn cmd_targets<A: TodoApi>(
    engine: &Engine<A>,
    args: TargetsArgs,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let to = args.to.unwrap_or(args.project);
    let targets = engine.valid_targets(args.project, args.id, to).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&targets)?);
    } else {
        for line in format_targets(&targets) {
            println!("{}", line);
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Write commands
// ---------------------------------------------------------------------------

async fn cmd_add<A: TodoApi>(
    engine: &Engine<A>,
    args: AddArgs,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let draft = NewTask {
        project_id: args.project,
        parent_id: args.parent,
        title: args.title,
        description: args.description,
        priority: args.priority,
    };
    let tree = engine.create(&draft).await?;
    print_tree(&tree, false, json)
}

async fn cmd_update<A: TodoApi>(
    engine: &Engine<A>,
    project: ProjectId,
    id: TaskId,
    patch: TaskPatch,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let tree = engine.apply_update(project, id, &patch).await?;
    print_tree(&tree, false, json)
}

async fn cmd_mv<A: TodoApi>(
    engine: &Engine<A>,
    args: MvArgs,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let request = MoveRequest {
        task: args.id,
        target_project: args.to.unwrap_or(args.project),
        target_parent: args.parent,
        position: args.position,
    };
    let outcome = engine.move_task(args.project, &request).await?;
    if let MoveOutcome::Switched { project, .. } = &outcome {
        if !json {
            println!("{} moved to project {}", args.id, project);
        }
    }
    print_tree(outcome.tree(), false, json)
}
