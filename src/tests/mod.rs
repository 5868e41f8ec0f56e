mod can;
