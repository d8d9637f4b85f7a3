//! Delivery of extracted messages into a maildir.
//!
//! Messages are written under `tmp/` first and renamed into `new/` once the
//! whole payload is on disk, so readers of the maildir never see a partial
//! file. `cur/` is left for mail clients to create.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::trace;

use crate::file::Message;

pub struct Maildir {
    tmp: PathBuf,
    new: PathBuf,
}

impl Maildir {
    /// Creates `tmp/` and `new/` under `root` if they don't exist yet.
    pub fn create<P: AsRef<Path>>(root: P) -> io::Result<Maildir> {
        let root = root.as_ref();
        let maildir = Maildir {
            tmp: root.join("tmp"),
            new: root.join("new"),
        };
        fs::create_dir_all(&maildir.new)?;
        fs::create_dir_all(&maildir.tmp)?;
        Ok(maildir)
    }

    /// Writes `msg` into `new/` and returns the path of the file.
    pub fn deliver(&self, msg: &Message) -> io::Result<PathBuf> {
        let name = file_name(msg)?;
        let tmp_path = self.tmp.join(&name);
        let new_path = self.new.join(&name);

        if let Err(e) = fs::write(&tmp_path, msg.data())
            .and_then(|()| fs::rename(&tmp_path, &new_path))
        {
            let _ = fs::remove_file(&tmp_path);
            return Err(e);
        }

        trace!("delivered {}", new_path.display());
        Ok(new_path)
    }
}

/// `<id>,S=<size>:2,` with no flags set.
fn file_name(msg: &Message) -> io::Result<String> {
    let id = msg.id();
    if id.is_empty() || id == "." || id == ".." || id.contains('/') || id.contains('\0') {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("message id {:?} cannot be used as a file name", id),
        ));
    }
    Ok(format!("{},S={}:2,", id, msg.len()))
}
