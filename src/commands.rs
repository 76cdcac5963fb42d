use crate::EdError;
use crate::cli::{DumpArgs, ShowArgs};
use crate::config::TeacherOptions;
use crate::episode::Perspective;
use crate::message::Message;
use crate::teacher::{DialogueTeacher, ExperiencerTeacher, Teacher};
use std::io::Write;
use std::path::Path;

pub fn handle_stats(opts: &TeacherOptions, datapath: &Path) -> Result<(), EdError> {
    let teacher = DialogueTeacher::new(opts, datapath)?;
    let by_side = |side: Perspective| {
        teacher
            .episodes()
            .iter()
            .filter(|e| e.perspective == side)
            .count()
    };
    let political = teacher
        .episodes()
        .iter()
        .filter(|e| e.has_political_turn())
        .count();

    eprintln!(
        "empathetic: split {} (perspective {})",
        teacher.split(),
        teacher.perspective()
    );
    eprintln!("empathetic: episodes: {}", teacher.episode_count());
    eprintln!("empathetic: examples: {}", teacher.example_count());
    eprintln!(
        "empathetic: experiencer episodes: {}, responder episodes: {}",
        by_side(Perspective::Experiencer),
        by_side(Perspective::Responder)
    );
    eprintln!("empathetic: episodes with political turns: {political}");
    Ok(())
}

pub fn handle_dump(opts: &TeacherOptions, datapath: &Path, args: &DumpArgs) -> Result<(), EdError> {
    let limit = args.limit.unwrap_or(usize::MAX);
    let written = if args.experiencer {
        let teacher = ExperiencerTeacher::new(opts, datapath)?;
        write_messages(teacher.iter().take(limit))?
    } else {
        let teacher = DialogueTeacher::new(opts, datapath)?;
        write_messages(teacher.iter().take(limit))?
    };
    eprintln!("empathetic: wrote {written} examples");
    Ok(())
}

pub fn handle_show(opts: &TeacherOptions, datapath: &Path, args: &ShowArgs) -> Result<(), EdError> {
    if args.experiencer {
        let teacher = ExperiencerTeacher::new(opts, datapath)?;
        write_messages(episode_messages(&teacher, args.episode)?)?;
    } else {
        let teacher = DialogueTeacher::new(opts, datapath)?;
        write_messages(episode_messages(&teacher, args.episode)?)?;
    }
    Ok(())
}

pub fn handle_check(opts: &TeacherOptions, datapath: &Path) -> Result<(), EdError> {
    let teacher = DialogueTeacher::new(opts, datapath)?;
    eprintln!(
        "empathetic: {} ok, {} episodes",
        teacher.split(),
        teacher.episode_count()
    );
    Ok(())
}

fn episode_messages<T: Teacher>(teacher: &T, episode: usize) -> Result<Vec<Message>, EdError> {
    let len = teacher.episode_len(episode).ok_or_else(|| {
        EdError::Index(format!(
            "episode {episode} out of range ({} episodes)",
            teacher.episode_count()
        ))
    })?;
    (0..len).map(|t| teacher.get(episode, t)).collect()
}

fn write_messages<I: IntoIterator<Item = Message>>(messages: I) -> Result<usize, EdError> {
    let stdout = std::io::stdout();
    let mut out = std::io::BufWriter::new(stdout.lock());
    let mut n = 0;
    for msg in messages {
        serde_json::to_writer(&mut out, &msg)?;
        out.write_all(b"\n")?;
        n += 1;
    }
    out.flush()?;
    Ok(n)
}
