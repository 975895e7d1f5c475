use crate::repl::RawRepl;
use anyhow::Result;
use std::io::{Read, Write};

/// Raw bytes per `unhexlify` call; keeps each command well under the
/// board's line buffer once hex-encoded.
const PUT_CHUNK: usize = 128;

/// Quote `s` as a Python string literal.
pub(crate) fn py_str(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

/// Write `data` to `remote` on the board, replacing any existing file.
pub(crate) fn put_bytes<T: Read + Write>(repl: &mut RawRepl<T>, data: &[u8], remote: &str) -> Result<()> {
    repl.exec(&format!("import ubinascii\nf=open({},'wb')\nw=f.write", py_str(remote)))?;
    for chunk in data.chunks(PUT_CHUNK) {
        if let Err(e) = repl.exec(&format!("w(ubinascii.unhexlify('{}'))", hex::encode(chunk))) {
            let _ = repl.exec("f.close()");
            return Err(e);
        }
    }
    repl.exec("f.close()")?;
    Ok(())
}

/// Create a directory; an existing one is not an error.
pub(crate) fn make_dir<T: Read + Write>(repl: &mut RawRepl<T>, remote: &str) -> Result<()> {
    repl.exec(&format!(
        "import os\ntry:\n os.mkdir({})\nexcept OSError as e:\n if e.args[0]!=17:\n  raise\n",
        py_str(remote)
    ))?;
    Ok(())
}

/// Remove a file, or a directory with everything below it.
pub(crate) fn remove_path<T: Read + Write>(repl: &mut RawRepl<T>, remote: &str) -> Result<()> {
    repl.exec(&format!(
        concat!(
            "import os\n",
            "def _rm(p):\n",
            " if os.stat(p)[0]&0x4000:\n",
            "  for n in os.listdir(p):\n",
            "   _rm(p+'/'+n)\n",
            "  os.rmdir(p)\n",
            " else:\n",
            "  os.remove(p)\n",
            "_rm({})\n",
        ),
        py_str(remote)
    ))?;
    Ok(())
}
