use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
mod auth;
use secureinfo::config::{ITERATIONS_VAR, PASSPHRASE_VAR, SALT_VAR};
use secureinfo::{
    Argon2idPhc, CipherConfig, Ciphertext, CredentialHasher, FileStore, FieldCipher, NewUser,
    ProfileUpdate, RecordCryptoOrchestrator, UserRecord, default_store_path,
};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum HashScheme {
    /// Unsalted SHA-256, base64 encoded
    Sha256,
    /// Argon2id PHC string with a random salt per password
    Argon2id,
}

impl HashScheme {
    fn hasher(self) -> CredentialHasher {
        match self {
            HashScheme::Sha256 => CredentialHasher::default(),
            HashScheme::Argon2id => CredentialHasher::with_strategy(Argon2idPhc::default()),
        }
    }
}

#[derive(Debug, clap::Args)]
struct CipherArgs {
    /// Passphrase the field encryption key is derived from
    #[arg(long, global = true, env = "SECUREINFO_PASSPHRASE", hide_env_values = true)]
    passphrase: Option<String>,

    /// Base64-encoded 16 byte key derivation salt
    #[arg(long, global = true, env = "SECUREINFO_SALT", hide_env_values = true)]
    salt: Option<String>,

    /// PBKDF2 iteration count (default: 10000)
    #[arg(long = "kdf-iterations", global = true, env = "SECUREINFO_KDF_ITERATIONS")]
    iterations: Option<u32>,
}

impl CipherArgs {
    fn to_config(&self) -> Result<CipherConfig> {
        let config = CipherConfig::from_lookup(|name| match name {
            PASSPHRASE_VAR => self.passphrase.clone(),
            SALT_VAR => self.salt.clone(),
            ITERATIONS_VAR => self.iterations.map(|n| n.to_string()),
            _ => None,
        })?;
        Ok(config)
    }
}

#[derive(Debug, clap::Args)]
struct ProfileArgs {
    /// Full name (stored as plaintext)
    #[arg(long)]
    full_name: Option<String>,

    /// Email address (stored as plaintext)
    #[arg(long)]
    email: Option<String>,

    /// Phone number (stored encrypted)
    #[arg(long)]
    phone: Option<String>,

    /// Postal address (stored encrypted)
    #[arg(long)]
    address: Option<String>,
}

#[derive(Debug, Parser)]
#[command(name = "secureinfo")]
#[command(
    version,
    about = "Registers users, verifies logins and keeps phone and address encrypted at rest."
)]
struct Cli {
    /// Path to the user store file
    #[arg(long, global = true, value_name = "PATH", env = "SECUREINFO_STORE")]
    store: Option<PathBuf>,

    /// Password hashing scheme for new passwords. Existing sha256 and
    /// argon2id hashes verify under either scheme.
    #[arg(long, global = true, value_enum, default_value_t = HashScheme::Sha256, env = "SECUREINFO_HASH")]
    hash: HashScheme,

    #[command(flatten)]
    cipher: CipherArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Registers a new user
    #[command(arg_required_else_help = true)]
    Register {
        username: String,
        #[command(flatten)]
        profile: ProfileArgs,
    },

    /// Verifies a password and shows the user's profile
    #[command(arg_required_else_help = true)]
    Login { username: String },

    /// Shows a user's decrypted profile
    #[command(arg_required_else_help = true)]
    Show { id: i64 },

    /// Updates profile fields; phone and address are re-encrypted
    #[command(arg_required_else_help = true)]
    Update {
        id: i64,
        #[command(flatten)]
        profile: ProfileArgs,
    },

    /// Prints the stored hash for a password
    HashPassword,

    /// Encrypts a field value as it would be stored
    #[command(arg_required_else_help = true)]
    EncryptField { text: String },

    /// Decrypts a stored field value
    #[command(arg_required_else_help = true)]
    DecryptField { ciphertext: String },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn open_store(path: Option<PathBuf>) -> Result<FileStore> {
    let path = match path {
        Some(p) => p,
        None => default_store_path()?,
    };
    FileStore::open(path)
}

fn print_profile(user: &UserRecord) {
    let show = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".to_string());
    println!("id:        {}", user.id);
    println!("username:  {}", user.username);
    println!("full name: {}", show(&user.full_name));
    println!("email:     {}", show(&user.email));
    println!("phone:     {}", show(&user.phone));
    println!("address:   {}", show(&user.address));
    println!("created:   {}", user.created_at.to_rfc3339());
    println!(
        "updated:   {}",
        user.updated_at
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "-".to_string())
    );
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let Cli {
        store,
        hash,
        cipher,
        command,
    } = Cli::parse();

    let hasher = hash.hasher();
    let cipher = FieldCipher::new(cipher.to_config()?);

    match command {
        Commands::Register { username, profile } => {
            let password = auth::read_new_password_with_confirmation()?;
            let mut records = RecordCryptoOrchestrator::new(&hasher, &cipher, open_store(store)?);
            let user = NewUser {
                username: username.clone(),
                password,
                full_name: profile.full_name,
                email: profile.email,
                phone: profile.phone,
                address: profile.address,
            };
            if !records.register(user)? {
                bail!("username '{username}' is already taken");
            }
            let id = records
                .find_by_username(&username)?
                .map(|u| u.id)
                .context("registered user could not be read back")?;
            println!("registered user '{username}' with id {id}");
        }
        Commands::Login { username } => {
            let password = auth::read_password()?;
            let records = RecordCryptoOrchestrator::new(&hasher, &cipher, open_store(store)?);
            let Some(user) = records.authenticate_and_fetch(&username, &password)? else {
                bail!("invalid username or password");
            };
            println!("login successful");
            if let Some(profile) = records.fetch_decrypted(user.id)? {
                print_profile(&profile);
            }
        }
        Commands::Show { id } => {
            let records = RecordCryptoOrchestrator::new(&hasher, &cipher, open_store(store)?);
            match records.fetch_decrypted(id)? {
                Some(profile) => print_profile(&profile),
                None => bail!("user {id} not found"),
            }
        }
        Commands::Update { id, profile } => {
            let mut records = RecordCryptoOrchestrator::new(&hasher, &cipher, open_store(store)?);
            let current = records
                .fetch_decrypted(id)?
                .with_context(|| format!("user {id} not found"))?;

            let mut update = ProfileUpdate::from(current);
            if let Some(full_name) = profile.full_name {
                update.full_name = Some(full_name);
            }
            if let Some(email) = profile.email {
                update.email = Some(email);
            }
            if let Some(phone) = profile.phone {
                update.phone = Some(phone);
            }
            if let Some(address) = profile.address {
                update.address = Some(address);
            }

            if !records.update_profile(update)? {
                bail!("user {id} was not updated");
            }
            println!("user {id} updated");
        }
        Commands::HashPassword => {
            let password = auth::read_password()?;
            println!("{}", hasher.hash(&password)?);
        }
        Commands::EncryptField { text } => {
            println!("{}", cipher.encrypt_str(&text));
        }
        Commands::DecryptField { ciphertext } => {
            let plaintext = cipher.decrypt_str(&Ciphertext::from_stored(ciphertext))?;
            println!("{plaintext}");
        }
    }

    Ok(())
}
