//! Prompt templates
//!
//! 모델에게 보내는 고정 문구. `{task}` 등 자리표시자는 `render`로 치환합니다.

use loom_core::ToolRegistry;

// ============================================================================
// Agent
// ============================================================================

const AGENT_HEADER: &str = "You are an AI agent that assists with software development by \
interacting with the local filesystem and running commands.

# Response Format

Every response MUST contain:
1. **Reasoning**: explain what you know, what you need, and why you chose this action.
2. **Exactly ONE JSON action** wrapped in ```json fences. It must be valid JSON.
3. **Proper escaping**: `content` fields must escape quotes (\\\") and newlines (\\\\n).

# Workflow

1. **Understand** the task and its constraints.
2. **Explore** before making changes. Never guess when you can verify.
3. **Act** one action at a time and wait for the result.
4. **Verify** changes by running tests or checking command output.
5. **Complete** with the `done` action and a comprehensive summary.

**Error Recovery:** if an action fails, analyze the error and try an alternative. \
Never repeat the exact same failing action.

# Available Actions";

/// 레지스트리 문서를 포함한 시스템 프롬프트
pub fn agent_system_prompt(registry: &ToolRegistry) -> String {
    format!("{}\n\n{}\n", AGENT_HEADER, registry.generate_prompt_section())
}

/// 단일 태스크 모드 첫 사용자 메시지
pub fn single_task_message(task: &str, working_dir: &str) -> String {
    format!("Task: {}\n\nWorking directory: {}", task, working_dir)
}

pub const REASONING_NUDGE: &str = "I see your reasoning. What would you like to do next? \
Please either take an action using one of the available tools, \
or use the 'done' action if you have completed the task.";

pub const FORMAT_CORRECTION: &str = "I could not parse a valid JSON action from your response. \
Please respond with exactly one JSON action block in ```json fences.";

pub const COMMAND_FAILED_WARNING: &str = "\n\nWARNING: The command above FAILED. \
Do NOT assume the operation succeeded or move on as if it did. \
Read the error output carefully, then either correct the command or try a different approach.";

/// 거절 메시지
pub fn declined_message(action: &str, unsafe_action: bool, feedback: &str) -> String {
    let mut msg = if unsafe_action {
        format!("The user declined the unsafe {} action.", action)
    } else {
        format!("The user declined the {} action.", action)
    };
    if !feedback.trim().is_empty() {
        msg.push_str(&format!(" Feedback: {}", feedback.trim()));
    }
    if unsafe_action {
        msg.push_str(" Please propose a different approach.");
    } else {
        msg.push_str(" Please propose a different approach or action.");
    }
    msg
}

/// 루프 감지 후 사용자 안내 주입
pub fn loop_guidance_message(loop_type: &str, guidance: &str) -> String {
    format!(
        "The system detected that you may be stuck in a loop ({}). \
         The user has provided the following guidance to help you:\n\n{}\n\n\
         Please take this feedback into account and try a different approach.",
        loop_type, guidance
    )
}

// ============================================================================
// Planning
// ============================================================================

pub const PLANNING_ANALYSIS_PROMPT: &str = "Analyze the following task to determine if it needs multi-step planning.

# Task
{task}

# Analysis Criteria

**Needs Planning** if the task:
- Requires multiple steps that build on each other
- Involves creating or modifying multiple files
- Needs coordination between different parts of the codebase
- Has explicit subtasks or phases

**Skip Planning** if the task:
- Is a simple, single-step operation
- Is a straightforward question or analysis
- Can be completed with one action

# Response Format
Respond with a JSON object:
```json
{\"needs_planning\": true or false}
```
";

pub const PLANNING_CONTEXT_PROMPT: &str = "Before planning the following task, determine what files (if any) must be read to create an accurate plan.

# Task
{task}

# Instructions

Only list files that are directly implied by the task and very likely to exist in the workspace.
Do NOT list files when the task can be planned without reading source code, or when you are guessing.

# Response Format
Respond with a JSON object:
```json
{\"needs_file_context\": true or false, \"files\": [\"relative/path/to/file\"], \"reason\": \"Brief explanation\"}
```
";

pub const PLANNING_GENERATION_PROMPT: &str = "Generate a detailed plan and task list for the following task.

# Task
{task}
{file_context}
# Instructions

1. **Create a Plan**: a concise overview (2-5 sentences) of the approach, key decisions and order of operations.
2. **Break Into Tasks**: specific, actionable tasks in order. Each task starts with an action verb \
and is small enough to complete in one agent run.

# Response Format

Respond with a JSON object:
```json
{\"plan\": \"Overall plan description here...\", \"tasks\": \"- [ ] First task\\n- [ ] Second task\"}
```

Use markdown checklist format with one task per line, each starting with `- [ ]`.
";

// ============================================================================
// Task list
// ============================================================================

pub const TASK_DETECTION_PROMPT: &str = "Analyze this user request. Should it be broken down into multiple tasks for better execution?

A task list approach is helpful when:
- The request asks to perform multiple distinct operations
- The request involves sequential steps
- You need to track progress through multiple stages

User Request:
\"{task}\"

Respond with ONLY \"yes\" or \"no\".";

pub const TASK_CREATION_PROMPT: &str = "Break down this request into specific, actionable tasks.

User Request:
\"{task}\"

Respond with a JSON object in this format:
{\"tasks\": [{\"id\": \"task_1\", \"description\": \"...\"}, {\"id\": \"task_2\", \"description\": \"...\"}]}

Include 2-5 tasks. Make descriptions clear and specific.";

pub const SYNTHESIS_PROMPT: &str = "You are synthesizing the final answer from multiple task resolutions.

{summary}

Create a comprehensive, well-organized final response that addresses the original request, \
incorporates findings from all tasks and highlights key results and recommendations.

Generate the final answer now:";

/// 자리표시자 치환
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    vars.iter().fold(template.to_string(), |acc, (key, value)| {
        acc.replace(&format!("{{{}}}", key), value)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_replaces_placeholders() {
        let text = render(PLANNING_GENERATION_PROMPT, &[("task", "Add auth"), ("file_context", "")]);
        assert!(text.contains("# Task\nAdd auth\n"));
        assert!(!text.contains("{task}"));
        assert!(!text.contains("{file_context}"));
    }

    #[test]
    fn test_system_prompt_lists_tools() {
        let prompt = agent_system_prompt(&ToolRegistry::with_builtins());
        assert!(prompt.contains("### run_command"));
        assert!(prompt.contains("### done"));
    }

    #[test]
    fn test_declined_message_feedback() {
        assert_eq!(
            declined_message("run_command", false, ""),
            "The user declined the run_command action. Please propose a different approach or action."
        );
        assert!(declined_message("wipe", true, " too risky ").contains("Feedback: too risky"));
    }
}
