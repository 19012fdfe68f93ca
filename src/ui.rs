use colored::*;

use crate::config::{AgentMode, Config};
use crate::mailbox::{MailboxMessage, ThreadSummary};

pub fn print_header(model: &str, mode: AgentMode) {
    let line = "─".repeat(60);
    println!("{}", line.black().bold());

    let name = "Gale".cyan().bold();
    let version = format!("v{}", env!("CARGO_PKG_VERSION")).black().bold();
    println!("  {} {}", name, version);
    println!("{}", format!("  {}  •  {}", model, mode).cyan());

    println!("{}", line.black().bold());
}

pub fn print_step(msg: &str) {
    println!("  {} {}", "•".green(), msg);
}

pub fn print_success(msg: &str) {
    println!("  {} {}", "✓".green().bold(), msg.green());
}

pub fn print_warning(msg: &str) {
    println!("  {} {}", "!".yellow().bold(), msg.yellow());
}

pub fn print_error(msg: &str) {
    eprintln!("  {} {}", "✗".red().bold(), msg.red());
}

pub fn print_response(text: &str) {
    println!("{}", text);
}

/// One line per thread, newest first.
pub fn print_threads(threads: &[ThreadSummary]) {
    if threads.is_empty() {
        print_step("No mailbox threads found.");
        return;
    }

    println!("{}", "Threads:".bold());
    for t in threads {
        println!("{}", thread_line(t));
    }
}

fn thread_line(t: &ThreadSummary) -> String {
    format!(
        "- {} | messages={} | first={} | last={}",
        t.thread_id.cyan(),
        t.message_count,
        t.first_timestamp,
        t.last_timestamp
    )
}

pub fn print_thread(thread_id: &str, messages: &[MailboxMessage]) {
    if messages.is_empty() {
        print_warning(&format!("No messages found for thread_id={}", thread_id));
        return;
    }

    println!("{} {}:", "Thread".bold(), thread_id.cyan());
    for m in messages {
        println!(
            "[{}] {} -> {}",
            m.timestamp.black().bold(),
            m.sender.yellow(),
            m.recipient.yellow()
        );
        let body = serde_json::to_string(&m.content).unwrap_or_else(|_| format!("{:?}", m.content));
        println!("  {}", body);
    }
}

pub fn print_status(config: &Config) {
    print_header(&config.model, config.mode());

    let key_state = |set: bool| if set { "set".green() } else { "missing".red() };

    println!("  {:<16} {}", "Mode:", config.mode());
    println!("  {:<16} {}", "Max turns:", config.max_turns);
    println!("  {:<16} {}", "Memory:", config.memory_file.display());
    println!("  {:<16} {}", "Memory window:", config.memory_max_entries);
    println!("  {:<16} {}", "Mailbox:", config.mailbox_file.display());
    println!("  {:<16} {}", "Log file:", config.log_file.display());
    println!("  {:<16} {}:{}", "API:", config.api_host, config.api_port);
    println!("  {:<16} {}", "Gemini key:", key_state(!config.google_api_key.is_empty()));
    println!("  {:<16} {}", "Weather key:", key_state(!config.weatherapi_key.is_empty()));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thread_line() {
        colored::control::set_override(false);
        let line = thread_line(&ThreadSummary {
            thread_id: "abc".to_string(),
            message_count: 4,
            first_timestamp: "t0".to_string(),
            last_timestamp: "t1".to_string(),
        });
        assert_eq!(line, "- abc | messages=4 | first=t0 | last=t1");
    }
}
