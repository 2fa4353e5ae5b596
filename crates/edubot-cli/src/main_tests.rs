//! CLI tests

use clap::{CommandFactory, Parser};

use crate::{
    ChatInput, Cli, Commands, CurriculumAction, DepartmentAction, ItemAction, KnowledgeAction,
    OutputFormat, parse_chat_line,
};

#[test]
fn test_cli_definition_is_consistent() {
    Cli::command().debug_assert();
}

#[test]
fn test_ask_with_context_and_global_flags() {
    let cli = Cli::try_parse_from([
        "edubot",
        "ask",
        "ما هو قانون أوم؟",
        "--grade",
        "الصف الأول الثانوي",
        "-d",
        "الفيزياء",
        "--user",
        "sara",
        "--format",
        "json",
        "-q",
    ])
    .unwrap();

    assert_eq!(cli.format, OutputFormat::Json);
    assert!(cli.quiet);
    match cli.command {
        Commands::Ask {
            question,
            context,
            file,
            user,
            pending,
            ..
        } => {
            assert_eq!(question.as_deref(), Some("ما هو قانون أوم؟"));
            assert_eq!(context.grade.as_deref(), Some("الصف الأول الثانوي"));
            assert_eq!(context.semester, None);
            assert_eq!(context.department.as_deref(), Some("الفيزياء"));
            assert_eq!(user, "sara");
            assert!(file.is_none());
            assert!(pending.is_none());
        }
        _ => panic!("expected ask"),
    }
}

#[test]
fn test_ask_pending_requires_confirm() {
    assert!(Cli::try_parse_from(["edubot", "ask", "--pending", "answer"]).is_err());

    let cli = Cli::try_parse_from(["edubot", "ask", "--pending", "answer", "--confirm", "نعم"])
        .unwrap();
    match cli.command {
        Commands::Ask {
            question,
            pending,
            confirm,
            ..
        } => {
            assert!(question.is_none());
            assert_eq!(pending.as_deref(), Some("answer"));
            assert_eq!(confirm.as_deref(), Some("نعم"));
        }
        _ => panic!("expected ask"),
    }
}

#[test]
fn test_department_grades_are_comma_separated() {
    let cli = Cli::try_parse_from([
        "edubot",
        "departments",
        "add",
        "الفيزياء",
        "--grades",
        "g1,g2",
    ])
    .unwrap();

    match cli.command {
        Commands::Departments {
            action: DepartmentAction::Add { name, grades, .. },
        } => {
            assert_eq!(name, "الفيزياء");
            assert_eq!(grades, vec!["g1".to_string(), "g2".to_string()]);
        }
        _ => panic!("expected departments add"),
    }
}

#[test]
fn test_curriculum_upload_requires_departments() {
    assert!(
        Cli::try_parse_from(["edubot", "curriculum", "upload", "book.pdf", "-g", "g", "-s", "s"])
            .is_err()
    );

    let cli = Cli::try_parse_from([
        "edubot",
        "curriculum",
        "upload",
        "book.pdf",
        "-g",
        "g",
        "-s",
        "s",
        "-d",
        "physics,chemistry",
    ])
    .unwrap();
    match cli.command {
        Commands::Curriculum {
            action:
                CurriculumAction::Upload {
                    file, departments, ..
                },
        } => {
            assert_eq!(file.to_str(), Some("book.pdf"));
            assert_eq!(departments.len(), 2);
        }
        _ => panic!("expected curriculum upload"),
    }
}

#[test]
fn test_admin_subcommands() {
    let cli = Cli::try_parse_from(["edubot", "semesters", "remove", "الفصل الدراسي الثاني"]).unwrap();
    assert!(matches!(
        cli.command,
        Commands::Semesters {
            action: ItemAction::Remove { .. }
        }
    ));

    let cli = Cli::try_parse_from([
        "edubot", "kb", "add", "--question", "س", "--answer", "ج", "-k", "كلمة",
    ])
    .unwrap();
    assert!(matches!(
        cli.command,
        Commands::Kb {
            action: KnowledgeAction::Add { .. }
        }
    ));

    let cli = Cli::try_parse_from(["edubot", "history"]).unwrap();
    assert!(matches!(cli.command, Commands::History { limit: 50 }));
    assert_eq!(cli.format, OutputFormat::Text);
}

#[test]
fn test_parse_chat_line() {
    assert_eq!(parse_chat_line("   "), ChatInput::Skip);
    assert_eq!(parse_chat_line("/quit"), ChatInput::Quit);
    assert_eq!(parse_chat_line(" /exit "), ChatInput::Quit);
    assert_eq!(parse_chat_line("/file"), ChatInput::Skip);
    assert_eq!(
        parse_chat_line("/file notes.pdf"),
        ChatInput::File {
            path: "notes.pdf",
            question: ""
        }
    );
    assert_eq!(
        parse_chat_line("/file scan.png ما هذا الرسم؟"),
        ChatInput::File {
            path: "scan.png",
            question: "ما هذا الرسم؟"
        }
    );
    assert_eq!(parse_chat_line(" ما هي الخلية؟ "), ChatInput::Text("ما هي الخلية؟"));
}

#[tokio::test]
async fn test_stage_file_copies_local_files_into_upload_area() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = edubot_core::config::Config::default();
    config.storage.upload_dir = Some(dir.path().join("uploads"));

    let local = dir.path().join("notes.txt");
    std::fs::write(&local, "ملاحظات الدرس").unwrap();

    let stored = crate::stage_file(&config, &local).await.unwrap();
    assert!(stored.ends_with("_notes.txt"));
    let staged = config.upload_dir().unwrap().join(&stored);
    assert_eq!(std::fs::read_to_string(staged).unwrap(), "ملاحظات الدرس");
    assert!(local.exists());

    // a name that is not a local file is passed through for the upload area to resolve
    let passed = crate::stage_file(&config, std::path::Path::new("already-uploaded.png"))
        .await
        .unwrap();
    assert_eq!(passed, "already-uploaded.png");
}
