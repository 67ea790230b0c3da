//! 端到端集成测试：脚本化 LLM，不依赖网络
//!
//! 覆盖完整闭环：高危写入挂起 -> 检查点落盘 -> 模拟进程重启后恢复 ->
//! 批准执行 -> 反思门控 -> 新一轮用 read_memory 找回。

use std::sync::Arc;

use magpie::core::{Orchestrator, TurnOutcome};
use magpie::llm::{ChatResponse, HashEmbedder, ScriptedChatClient};
use magpie::memory::{Message, MemoryStore, SqliteMemoryStore, ThreadStore, ToolCall};
use magpie::reflect::ReflectionEngine;
use magpie::tools::{ReadMemoryTool, ToolRegistry, WriteMemoryTool};
use serde_json::json;

fn registry(memory: Arc<dyn MemoryStore>) -> Arc<ToolRegistry> {
    let mut registry = ToolRegistry::new(5);
    registry.register(ReadMemoryTool::new(memory.clone())).unwrap();
    registry.register(WriteMemoryTool::new(memory)).unwrap();
    Arc::new(registry)
}

fn write_call(id: &str) -> ToolCall {
    ToolCall {
        id: id.into(),
        name: "write_memory".into(),
        arguments: json!({
            "content": "선호 언어: Python",
            "memory_type": "profile",
            "importance": 5,
            "tags": ["lang_pref"]
        }),
    }
}

#[tokio::test]
async fn risky_write_confirmed_across_restart_then_recalled() {
    let dir = tempfile::tempdir().unwrap();
    let embedder = Arc::new(HashEmbedder::default());
    let db_path = dir.path().join("memory.db");
    let threads = ThreadStore::new(dir.path().join("threads"));

    // 第一阶段：write_memory 是高危工具，必须挂起
    let memory: Arc<dyn MemoryStore> =
        Arc::new(SqliteMemoryStore::open(&db_path, embedder.clone()).unwrap());
    let chat = Arc::new(ScriptedChatClient::new(vec![ChatResponse::calls(vec![
        write_call("call_w"),
    ])]));
    let orchestrator = Orchestrator::new(chat, registry(memory.clone()), 6);

    let mut thread = threads.load_or_create("s1").unwrap();
    let outcome = orchestrator
        .run_turn(&mut thread, "내 선호 언어는 Python이야. 기억해줘.")
        .await
        .unwrap();
    match outcome {
        TurnOutcome::AwaitingConfirmation { prompt } => assert!(prompt.contains("write_memory")),
        other => panic!("expected suspension, got {:?}", other),
    }
    threads.save(&thread).unwrap();
    assert_eq!(memory.count().unwrap(), 0, "确认前不得有副作用");
    drop(orchestrator);
    drop(thread);

    // 第二阶段：模拟进程重启——全新组件，仅凭检查点 + token 恢复
    let memory2: Arc<dyn MemoryStore> =
        Arc::new(SqliteMemoryStore::open(&db_path, embedder.clone()).unwrap());
    let judge = Arc::new(ScriptedChatClient::new(vec![ChatResponse::text(
        r#"{"should_write": false}"#,
    )]));
    let reflection = Arc::new(ReflectionEngine::new(judge, memory2.clone()));
    let orchestrator2 = Orchestrator::new(
        Arc::new(ScriptedChatClient::new(vec![ChatResponse::text(
            "기억했습니다.",
        )])),
        registry(memory2.clone()),
        6,
    )
    .with_reflection(reflection.clone());

    let mut restored = threads.load("s1").unwrap().expect("checkpoint must exist");
    assert!(restored.is_suspended());
    let outcome = orchestrator2.resume(&mut restored, "y").await.unwrap();
    match outcome {
        TurnOutcome::Completed { answer, .. } => assert_eq!(answer, "기억했습니다."),
        other => panic!("expected completion, got {:?}", other),
    }
    threads.save(&restored).unwrap();
    assert_eq!(memory2.count().unwrap(), 1, "批准后恰好执行一次");
    assert_eq!(reflection.parse_failures(), 0);

    // 第三阶段：新一轮对话，read_memory 找回写入的内容
    let orchestrator3 = Orchestrator::new(
        Arc::new(ScriptedChatClient::new(vec![
            ChatResponse::calls(vec![ToolCall {
                id: "call_r".into(),
                name: "read_memory".into(),
                arguments: json!({"query": "선호 언어", "memory_type": "profile"}),
            }]),
            ChatResponse::text("Python을 선호하십니다."),
        ])),
        registry(memory2.clone()),
        6,
    );
    let mut thread3 = threads.load("s1").unwrap().unwrap();
    let outcome = orchestrator3
        .run_turn(&mut thread3, "지난 번에 말한 내 선호 언어가 뭐였지?")
        .await
        .unwrap();
    match outcome {
        TurnOutcome::Completed { answer, trajectory } => {
            assert_eq!(answer, "Python을 선호하십니다.");
            assert_eq!(trajectory.traces.len(), 1);
            assert_eq!(trajectory.traces[0].tool_name, "read_memory");
        }
        other => panic!("expected completion, got {:?}", other),
    }
    let observation = thread3
        .messages()
        .iter()
        .find_map(|m| match m {
            Message::Tool { tool_call_id, content } if tool_call_id == "call_r" => {
                Some(content.clone())
            }
            _ => None,
        })
        .expect("read_memory observation");
    assert!(observation.contains("선호 언어: Python"));
}

#[tokio::test]
async fn denied_confirmation_leaves_memory_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let memory: Arc<dyn MemoryStore> = Arc::new(
        SqliteMemoryStore::open(dir.path().join("memory.db"), Arc::new(HashEmbedder::default()))
            .unwrap(),
    );
    let chat = Arc::new(ScriptedChatClient::new(vec![
        ChatResponse::calls(vec![write_call("call_w")]),
        ChatResponse::text("알겠습니다, 저장하지 않을게요."),
    ]));
    let orchestrator = Orchestrator::new(chat, registry(memory.clone()), 6);

    let mut thread = magpie::memory::Thread::new("s2");
    orchestrator.run_turn(&mut thread, "기억해줘").await.unwrap();
    let outcome = orchestrator.resume(&mut thread, "n").await.unwrap();

    assert!(matches!(outcome, TurnOutcome::Completed { .. }));
    assert_eq!(memory.count().unwrap(), 0);
    let cancelled = thread.messages().iter().any(|m| {
        matches!(m, Message::Tool { tool_call_id, content }
            if tool_call_id == "call_w" && content.contains("cancelled"))
    });
    assert!(cancelled, "取消结果消息必须存在且与调用 id 对应");
}
