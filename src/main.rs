//! Magpie - 工具调用型对话智能体
//!
//! 入口：初始化日志与组件，跑一个极简 REPL。挂起（高危工具确认）时
//! 下一行输入即确认 token："y" 批准执行，其余取消。

use std::io::{BufRead, Write};

use anyhow::Context;
use magpie::agent::{create_components, process_message, resume_thread};
use magpie::config::load_config;
use magpie::core::TurnOutcome;
use magpie::observability;
use magpie::tools::ingest_document;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init();

    let cfg = load_config(None).unwrap_or_else(|e| {
        tracing::warn!("config load failed ({}), using defaults", e);
        magpie::config::AppConfig::default()
    });
    let components = create_components(cfg).context("failed to create agent components")?;

    let thread_id = std::env::args().nth(1).unwrap_or_else(|| "cli".to_string());
    println!("magpie ready (thread: {}). Ctrl-D to exit.", thread_id);

    let stdin = std::io::stdin();
    let mut awaiting_confirmation = false;

    loop {
        print!("> ");
        std::io::stdout().flush().ok();
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        // :ingest <file> 把文档导入知识库（供 rag_search 检索）
        if let Some(path) = input.strip_prefix(":ingest ") {
            match std::fs::read_to_string(path.trim()) {
                Ok(text) => {
                    match ingest_document(components.knowledge.as_ref(), path.trim(), &text).await {
                        Ok(n) => println!("ingested {} paragraphs from {}", n, path.trim()),
                        Err(e) => eprintln!("ingest failed: {}", e),
                    }
                }
                Err(e) => eprintln!("cannot read {}: {}", path.trim(), e),
            }
            continue;
        }

        let outcome = if awaiting_confirmation {
            resume_thread(&components, &thread_id, input).await
        } else {
            process_message(&components, &thread_id, input).await
        };

        match outcome {
            Ok(TurnOutcome::Completed { answer, .. }) => {
                awaiting_confirmation = false;
                println!("{}", answer);
            }
            Ok(TurnOutcome::AwaitingConfirmation { prompt }) => {
                awaiting_confirmation = true;
                println!("{}", prompt);
            }
            Err(e) => {
                awaiting_confirmation = false;
                eprintln!("error: {}", e);
            }
        }
    }

    Ok(())
}
