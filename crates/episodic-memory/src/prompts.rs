//! Prompt templates
//!
//! Every prompt the memory subsystem sends to the language oracle lives here,
//! together with the label attached to the request for tracing.

/// Label of identification requests
pub const IDENTIFY_LABEL: &str = "episode_identification";

/// Label of summary update requests
pub const SUMMARIZE_LABEL: &str = "episode_summary";

/// Label of merge requests
pub const MERGE_LABEL: &str = "episode_merge";

/// Label of the conversation call made by the agent
pub const CONVERSATION_LABEL: &str = "conversation";

/// Default preamble of the conversation prompt
pub const DEFAULT_SYSTEM_PROMPT: &str = "\
You are a helpful assistant able to hold long conversations on a wide range of topics. \
You keep an episodic memory of what the human told you in earlier conversations; \
use it when it is relevant and never invent memories you do not have.";

/// Identification prompt for the latest utterance
pub fn identification_prompt(
    history: &str,
    input: &str,
    keyword_count: usize,
    human_prefix: &str,
    sentinel: &str,
) -> String {
    format!(
        "You maintain an episodic memory of the topics humans discuss with you.\n\
Classify the last line of the dialogue below using exactly {keyword_count} keywords \
that describe what the human is talking about. Do not use personal names.\n\
Answer with the keywords only, on a single line, separated by commas.\n\
If the line carries no topic at all, answer {sentinel}.\n\
\n\
[RECENT DIALOGUE]\n\
{history}\n\
\n\
[LAST LINE OF DIALOGUE]\n\
{human_prefix}: {input}\n\
Keywords:"
    )
}

/// Summary update prompt for one episode
pub fn summarization_prompt(
    episode_hrid: &str,
    summary: &str,
    history: &str,
    input: &str,
    output: &str,
    human_prefix: &str,
    ai_prefix: &str,
) -> String {
    let summary = if summary.is_empty() {
        "(empty)"
    } else {
        summary
    };

    format!(
        "You act as the episodic memory of an assistant and keep durable facts about the humans it talks to.\n\
Update the episode summary below with any new facts from the last lines of the conversation.\n\
If the summary is empty, write a single sentence. Otherwise extend it.\n\
If the last lines add nothing worth remembering long-term about this episode, \
return the existing summary unchanged.\n\
Answer with the summary text only.\n\
\n\
Episode summary ({episode_hrid}):\n\
{summary}\n\
\n\
Earlier conversation:\n\
{history}\n\
\n\
Last lines of conversation:\n\
{human_prefix}: {input}\n\
{ai_prefix}: {output}\n\
Updated summary:"
    )
}

/// Merge prompt for a set of episode summaries
pub fn merge_prompt(episodes_summary: &str, keyword_count: usize) -> String {
    format!(
        "You keep track of facts about episodes in the lives of the humans you talk to.\n\
Several stored episodes turned out to cover the same topic. Combine their summaries below \
into one summary that keeps every fact about the episodes and drops repetitions.\n\
Return a JSON object with two attributes:\n\
- \"summary\": the combined summary as a string\n\
- \"categories\": a comma-separated string of exactly {keyword_count} keywords categorizing the combined summary\n\
\n\
<Summary of Current Episodes>\n\
\n\
{episodes_summary}\n\
\n\
New Episode Summary JSON:"
    )
}

/// Conversation prompt rendered by the agent
pub fn conversation_prompt(
    system_prompt: &str,
    episode: &str,
    history: &str,
    input: &str,
    human_prefix: &str,
) -> String {
    format!(
        "{system_prompt}\n\
\n\
Episodic memory:\n\
{episode}\n\
\n\
Current conversation:\n\
{history}\n\
Last line:\n\
{human_prefix}: {input}\n\
You:"
    )
}
