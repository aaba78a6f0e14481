use std::env;
use std::path::Path;
use std::process::exit;

use wadkit::crypto::TitleCrypto;
use wadkit::tmd::Region;
use wadkit::{edit, wad, WadError};

const USAGE: &str = "usage:
  wadkit unpack  <wad> <dir> <keyfile>
  wadkit pack    <dir> <out.wad> <keyfile>
  wadkit region  <wad> <japan|usa|europe|free>
  wadkit titleid <wad> <keyfile> <4 chars>
  wadkit titles  <wad> <keyfile>
  wadkit rename  <wad> <keyfile> <title>";

fn main() {
    let args: Vec<String> = env::args().skip(1).collect();
    if let Err(e) = run(&args) {
        eprintln!("error: {e}");
        exit(1);
    }
}

fn run(args: &[String]) -> Result<(), WadError> {
    match args {
        [cmd, wad_path, dir, keyfile] if cmd == "unpack" => {
            let crypto = TitleCrypto::from_key_file(Path::new(keyfile))?;
            let image = std::fs::read(wad_path)?;
            wad::unpack_wad(&image, &crypto, Path::new(dir))
        }
        [cmd, dir, out, keyfile] if cmd == "pack" => {
            let crypto = TitleCrypto::from_key_file(Path::new(keyfile))?;
            let image = wad::pack_wad(Path::new(dir), &crypto, true)?;
            std::fs::write(out, image)?;
            Ok(())
        }
        [cmd, wad_path, region] if cmd == "region" => {
            let region = match region.as_str() {
                "japan" => Region::Japan,
                "usa" => Region::Usa,
                "europe" => Region::Europe,
                "free" => Region::Free,
                _ => return usage(),
            };
            let mut image = std::fs::read(wad_path)?;
            edit::change_region(&mut image, region)?;
            std::fs::write(wad_path, image)?;
            Ok(())
        }
        [cmd, wad_path, keyfile, id] if cmd == "titleid" => {
            let tail: [u8; 4] = match id.as_bytes().try_into() {
                Ok(tail) => tail,
                Err(_) => return usage(),
            };
            let crypto = TitleCrypto::from_key_file(Path::new(keyfile))?;
            let mut image = std::fs::read(wad_path)?;
            edit::change_title_id(&mut image, &crypto, tail)?;
            std::fs::write(wad_path, image)?;
            Ok(())
        }
        [cmd, wad_path, keyfile] if cmd == "titles" => {
            let crypto = TitleCrypto::from_key_file(Path::new(keyfile))?;
            let image = std::fs::read(wad_path)?;
            for title in edit::channel_titles(&image, &crypto)? {
                println!("{title}");
            }
            Ok(())
        }
        [cmd, wad_path, keyfile, title] if cmd == "rename" => {
            let crypto = TitleCrypto::from_key_file(Path::new(keyfile))?;
            let mut image = std::fs::read(wad_path)?;
            let titles = [title.as_str(); wadkit::imet::LANGUAGES];
            edit::change_channel_titles(&mut image, &crypto, &titles)?;
            std::fs::write(wad_path, image)?;
            Ok(())
        }
        _ => usage(),
    }
}

fn usage() -> Result<(), WadError> {
    eprintln!("{USAGE}");
    exit(1);
}
